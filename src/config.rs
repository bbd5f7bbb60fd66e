//! Builder configuration.
//!
//! Release constants are compiled in. A TOML file may override any of them:
//!
//! ```toml
//! release_tag = "2025-06-08"
//! package_prefix = "apio-oss-cad-suite"
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{BuildError, IoContext, Result};

/// Upstream release download base.
pub const DEFAULT_RELEASE_BASE_URL: &str =
    "https://github.com/YosysHQ/oss-cad-suite-build/releases/download";

/// The oss-cad-suite release we repackage.
pub const DEFAULT_RELEASE_TAG: &str = "2025-06-08";

/// Prefix of the generated package file names.
pub const DEFAULT_PACKAGE_PREFIX: &str = "apio-oss-cad-suite";

/// Top-level directory created by extracting an upstream asset.
pub const DEFAULT_EXTRACTED_DIR: &str = "oss-cad-suite";

/// Settings shared by every run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuilderConfig {
    pub release_base_url: String,
    pub release_tag: String,
    pub package_prefix: String,
    pub extracted_dir: String,
    /// Upstream version marker file, renamed so it does not collide with
    /// our own metadata.
    pub version_marker: String,
    pub renamed_version_marker: String,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            release_base_url: DEFAULT_RELEASE_BASE_URL.to_string(),
            release_tag: DEFAULT_RELEASE_TAG.to_string(),
            package_prefix: DEFAULT_PACKAGE_PREFIX.to_string(),
            extracted_dir: DEFAULT_EXTRACTED_DIR.to_string(),
            version_marker: "VERSION".to_string(),
            renamed_version_marker: "YOSYS-VERSION".to_string(),
        }
    }
}

impl BuilderConfig {
    /// Load a config file. Fields not present keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .io_context(|| format!("reading config '{}'", path.display()))?;
        Self::from_toml(&text).map_err(|e| match e {
            BuildError::Configuration(msg) => {
                BuildError::Configuration(format!("'{}': {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parse and validate config text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: BuilderConfig = toml::from_str(text)
            .map_err(|e| BuildError::Configuration(format!("parsing config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let fields = [
            ("release_base_url", &self.release_base_url),
            ("release_tag", &self.release_tag),
            ("package_prefix", &self.package_prefix),
            ("extracted_dir", &self.extracted_dir),
            ("version_marker", &self.version_marker),
            ("renamed_version_marker", &self.renamed_version_marker),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(BuildError::Configuration(format!(
                    "{name} must not be empty"
                )));
            }
        }
        for (name, value) in [
            ("extracted_dir", &self.extracted_dir),
            ("version_marker", &self.version_marker),
            ("renamed_version_marker", &self.renamed_version_marker),
        ] {
            if value.contains('/') || value.contains('\\') || value.contains("..") {
                return Err(BuildError::Configuration(format!(
                    "{name} must be a plain file name, got '{value}'"
                )));
            }
        }
        Ok(())
    }
}
