//! Invocation-scoped build context.
//!
//! All paths a run touches are computed here up front and passed around
//! explicitly; the process working directory is never changed.

use std::path::{Path, PathBuf};

use crate::archive::ArchiveFormat;
use crate::config::BuilderConfig;
use crate::metadata::MetadataFormat;
use crate::platform::PlatformConfig;

/// Scratch directory for downloaded and extracted upstream content.
pub const UPSTREAM_DIR: &str = "_upstream";

/// Scratch directory for the assembled tree and home of the final package.
pub const PACKAGES_DIR: &str = "_packages";

/// What the caller asked for.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub platform_id: String,
    /// Embedded in the output file name, typically a date like `20250608`.
    pub package_tag: String,
    /// Optional build-info input merged into the package.
    pub build_info: Option<PathBuf>,
    pub archive_format: ArchiveFormat,
    pub metadata_format: MetadataFormat,
}

impl BuildRequest {
    pub fn new(platform_id: impl Into<String>, package_tag: impl Into<String>) -> Self {
        Self {
            platform_id: platform_id.into(),
            package_tag: package_tag.into(),
            build_info: None,
            archive_format: ArchiveFormat::TarGz,
            metadata_format: MetadataFormat::Json,
        }
    }
}

/// Paths and names for one run.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub work_dir: PathBuf,
    /// `_upstream/<platform>`
    pub upstream_dir: PathBuf,
    /// `_packages`
    pub packages_root: PathBuf,
    /// `_packages/<platform>`, deleted after archiving.
    pub package_dir: PathBuf,
    pub upstream_file_name: String,
    pub upstream_url: String,
    pub package_file_name: String,
}

impl BuildContext {
    pub fn new(
        work_dir: &Path,
        config: &BuilderConfig,
        platform: &PlatformConfig,
        request: &BuildRequest,
    ) -> Self {
        let upstream_file_name = platform.upstream_file_name(&config.release_tag);
        let upstream_url = format!(
            "{}/{}/{}",
            config.release_base_url.trim_end_matches('/'),
            config.release_tag,
            upstream_file_name
        );
        let package_file_name = format!(
            "{}-{}-{}.{}",
            config.package_prefix,
            platform.id,
            request.package_tag,
            request.archive_format.extension()
        );
        let packages_root = work_dir.join(PACKAGES_DIR);

        Self {
            work_dir: work_dir.to_path_buf(),
            upstream_dir: work_dir.join(UPSTREAM_DIR).join(platform.id),
            package_dir: packages_root.join(platform.id),
            packages_root,
            upstream_file_name,
            upstream_url,
            package_file_name,
        }
    }

    /// Where the downloaded upstream asset lands.
    pub fn upstream_archive(&self) -> PathBuf {
        self.upstream_dir.join(&self.upstream_file_name)
    }

    /// The deliverable.
    pub fn package_path(&self) -> PathBuf {
        self.packages_root.join(&self.package_file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::lookup;

    #[test]
    fn test_linux_context() {
        let config = BuilderConfig::default();
        let platform = lookup("linux-x86-64").unwrap();
        let request = BuildRequest::new("linux-x86-64", "20250608");
        let ctx = BuildContext::new(Path::new("/work"), &config, platform, &request);

        assert_eq!(ctx.upstream_dir, Path::new("/work/_upstream/linux-x86-64"));
        assert_eq!(ctx.package_dir, Path::new("/work/_packages/linux-x86-64"));
        assert_eq!(
            ctx.upstream_url,
            "https://github.com/YosysHQ/oss-cad-suite-build/releases/download/2025-06-08/oss-cad-suite-linux-x64-20250608.tgz"
        );
        assert_eq!(
            ctx.package_path(),
            Path::new("/work/_packages/apio-oss-cad-suite-linux-x86-64-20250608.tar.gz")
        );
        assert_eq!(
            ctx.upstream_archive(),
            Path::new("/work/_upstream/linux-x86-64/oss-cad-suite-linux-x64-20250608.tgz")
        );
    }

    #[test]
    fn test_zip_and_trailing_slash() {
        let config = BuilderConfig {
            release_base_url: "https://mirror.example/releases/".to_string(),
            ..BuilderConfig::default()
        };
        let platform = lookup("windows-amd64").unwrap();
        let mut request = BuildRequest::new("windows-amd64", "1.2.3");
        request.archive_format = ArchiveFormat::Zip;
        let ctx = BuildContext::new(Path::new("w"), &config, platform, &request);

        assert_eq!(
            ctx.upstream_url,
            "https://mirror.example/releases/2025-06-08/oss-cad-suite-windows-x64-20250608.exe"
        );
        assert_eq!(
            ctx.package_file_name,
            "apio-oss-cad-suite-windows-amd64-1.2.3.zip"
        );
    }
}
