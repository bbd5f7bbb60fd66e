//! Fetching and unpacking the upstream release asset.
//!
//! [`Upstream`] is the seam between the pipeline and the host: the default
//! [`CommandUpstream`] shells out to `wget` and the platform's extraction
//! command, tests plug in a stub that lays down a fixture tree.

use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::error::{BuildError, Result};
use crate::platform::PlatformConfig;
use crate::preflight;

/// Download and extraction steps of a run.
pub trait Upstream {
    /// Verify the host can perform the other two steps.
    fn check_host(&self, _platform: &PlatformConfig) -> Result<()> {
        Ok(())
    }

    /// Download `url` to the file `dest`.
    fn download(&self, url: &str, dest: &Path) -> Result<()>;

    /// Extract `archive` into `into_dir`.
    fn extract(&self, platform: &PlatformConfig, archive: &Path, into_dir: &Path) -> Result<()>;
}

/// Upstream steps backed by host commands.
///
/// Child processes inherit stdout and stderr, so tool output and errors
/// reach the user unmodified.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandUpstream;

impl Upstream for CommandUpstream {
    fn check_host(&self, platform: &PlatformConfig) -> Result<()> {
        preflight::check_required_tools(&preflight::tools_for(platform))
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        info!(url, dest = %dest.display(), "downloading");
        let mut cmd = Command::new("wget");
        cmd.arg("-nv").arg("-O").arg(dest).arg(url);
        debug!(?cmd, "running");

        let status = cmd.status().map_err(|e| BuildError::Download {
            url: url.to_string(),
            reason: format!("running wget: {e}"),
        })?;
        if !status.success() {
            return Err(BuildError::Download {
                url: url.to_string(),
                reason: format!("wget exited with {status}"),
            });
        }
        Ok(())
    }

    fn extract(&self, platform: &PlatformConfig, archive: &Path, into_dir: &Path) -> Result<()> {
        info!(archive = %archive.display(), "extracting");
        let (program, args) = platform
            .extract_command
            .split_first()
            .ok_or_else(|| BuildError::Extraction {
                archive: archive.to_path_buf(),
                reason: format!("platform '{}' has no extraction command", platform.id),
            })?;

        let mut cmd = Command::new(program);
        cmd.args(args).arg(archive).current_dir(into_dir);
        debug!(?cmd, dir = %into_dir.display(), "running");

        let status = cmd.status().map_err(|e| BuildError::Extraction {
            archive: archive.to_path_buf(),
            reason: format!("running {program}: {e}"),
        })?;
        if !status.success() {
            return Err(BuildError::Extraction {
                archive: archive.to_path_buf(),
                reason: format!("{program} exited with {status}"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::lookup;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_extract_tarball() {
        let temp = TempDir::new().unwrap();
        let tree = temp.path().join("tree");
        fs::create_dir_all(tree.join("oss-cad-suite/bin")).unwrap();
        fs::write(tree.join("oss-cad-suite/bin/yosys"), "x").unwrap();

        let archive = temp.path().join("suite.tgz");
        let status = Command::new("tar")
            .arg("zcf")
            .arg(&archive)
            .arg("-C")
            .arg(&tree)
            .arg("oss-cad-suite")
            .status()
            .unwrap();
        assert!(status.success());

        let out = temp.path().join("out");
        fs::create_dir_all(&out).unwrap();
        CommandUpstream
            .extract(lookup("linux-x86-64").unwrap(), &archive, &out)
            .unwrap();

        assert!(out.join("oss-cad-suite/bin/yosys").is_file());
    }

    #[test]
    fn test_extract_failure_is_extraction_error() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("garbage.tgz");
        fs::write(&archive, "not a tarball").unwrap();

        let err = CommandUpstream
            .extract(lookup("linux-x86-64").unwrap(), &archive, temp.path())
            .unwrap_err();
        assert!(matches!(err, BuildError::Extraction { .. }));
    }
}
