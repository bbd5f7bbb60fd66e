//! Error taxonomy for a packaging run.
//!
//! Every variant aborts the run. Nothing is caught or rolled back; scratch
//! directories are left in place for inspection.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building a package.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Unknown platform id, bad config file, or missing host tools.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The transfer command failed or could not be spawned.
    #[error("download of '{url}' failed: {reason}")]
    Download { url: String, reason: String },

    /// The extraction command failed or could not be spawned.
    #[error("extraction of '{}' failed: {reason}", archive.display())]
    Extraction { archive: PathBuf, reason: String },

    /// A required file is missing or not executable, or a packaging
    /// precondition does not hold.
    #[error("validation failed for '{}': {reason}", path.display())]
    Validation { path: PathBuf, reason: String },

    /// The build-info input is missing, unreadable or malformed.
    #[error("metadata error for '{}': {reason}", path.display())]
    Metadata { path: PathBuf, reason: String },

    /// The final archive was not produced.
    #[error("packaging error for '{}': {reason}", path.display())]
    Packaging { path: PathBuf, reason: String },

    /// Filesystem failure, with the action that was attempted.
    #[error("{action}: {source}")]
    Io {
        action: String,
        #[source]
        source: io::Error,
    },
}

impl BuildError {
    pub(crate) fn validation(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn metadata(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Metadata {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Attach the attempted action to an `io::Error`.
pub(crate) trait IoContext<T> {
    fn io_context<F>(self, action: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> IoContext<T> for io::Result<T> {
    fn io_context<F>(self, action: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| BuildError::Io {
            action: action(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_names_path() {
        let err = BuildError::validation("pkg/bin/yosys", "missing");
        let msg = err.to_string();
        assert!(msg.contains("pkg/bin/yosys"));
        assert!(msg.contains("missing"));
    }

    #[test]
    fn test_io_context_keeps_action_and_source() {
        let res: io::Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = res
            .io_context(|| "removing 'x'".to_string())
            .unwrap_err();

        assert!(matches!(err, BuildError::Io { .. }));
        assert_eq!(err.to_string(), "removing 'x': gone");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_download_displays_url() {
        let err = BuildError::Download {
            url: "https://example.invalid/a.tgz".to_string(),
            reason: "exit status: 8".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "download of 'https://example.invalid/a.tgz' failed: exit status: 8"
        );
    }
}
