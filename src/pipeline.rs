//! Pipeline driver: one platform, one run, fail fast.
//!
//! Steps, in order:
//!
//! 1. resolve the platform and check the build-info input
//! 2. host preflight
//! 3. create `_upstream/<platform>` and `_packages/<platform>`
//! 4. download the upstream asset
//! 5. extract it
//! 6. delete the asset
//! 7. package the extracted tree
//! 8. write build info (if an input was given)
//! 9. archive the package directory
//! 10. delete the package directory
//! 11. verify the final archive
//!
//! Any failure aborts the run and leaves the scratch directories behind for
//! inspection.

use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::archive::create_archive;
use crate::config::BuilderConfig;
use crate::context::{BuildContext, BuildRequest};
use crate::error::{BuildError, IoContext, Result};
use crate::metadata::{self, BuildProperties};
use crate::package::package;
use crate::platform;
use crate::upstream::Upstream;

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReport {
    pub platform_id: String,
    pub package_path: PathBuf,
    pub size_bytes: u64,
    pub sha256: String,
}

/// Build the package described by `request` under `work_dir`.
pub fn run(
    config: &BuilderConfig,
    work_dir: &Path,
    request: &BuildRequest,
    upstream: &dyn Upstream,
) -> Result<PackageReport> {
    let platform = platform::lookup(&request.platform_id)?;
    if let Some(input) = &request.build_info {
        metadata::check_input(input)?;
    }

    let ctx = BuildContext::new(work_dir, config, platform, request);
    info!(
        platform = platform.id,
        release_tag = %config.release_tag,
        package_tag = %request.package_tag,
        package = %ctx.package_file_name,
        "building package"
    );

    upstream.check_host(platform)?;

    for dir in [&ctx.upstream_dir, &ctx.package_dir] {
        fs::create_dir_all(dir)
            .io_context(|| format!("creating directory '{}'", dir.display()))?;
    }

    let archive = ctx.upstream_archive();
    upstream.download(&ctx.upstream_url, &archive)?;
    upstream.extract(platform, &archive, &ctx.upstream_dir)?;

    info!(path = %archive.display(), "deleting upstream archive");
    fs::remove_file(&archive)
        .io_context(|| format!("deleting upstream archive '{}'", archive.display()))?;

    let source_dir = ctx.upstream_dir.join(&config.extracted_dir);
    package(platform, config, &source_dir, &ctx.package_dir)?;

    if let Some(input) = &request.build_info {
        let props = BuildProperties {
            platform_id: platform.id,
            yosys_tag: &config.release_tag,
            file_name: &ctx.package_file_name,
        };
        metadata::write_build_info(request.metadata_format, input, &props, &ctx.package_dir)?;
    }

    let package_path = ctx.package_path();
    info!(path = %package_path.display(), "compressing package");
    create_archive(request.archive_format, &ctx.package_dir, &package_path)?;

    info!(path = %ctx.package_dir.display(), "deleting package dir");
    fs::remove_dir_all(&ctx.package_dir).io_context(|| {
        format!("deleting package dir '{}'", ctx.package_dir.display())
    })?;

    verify_package(platform.id, &package_path)
}

fn verify_package(platform_id: &str, package_path: &Path) -> Result<PackageReport> {
    if !package_path.is_file() {
        return Err(BuildError::Packaging {
            path: package_path.to_path_buf(),
            reason: "final package was not produced".to_string(),
        });
    }
    let (sha256, size_bytes) = sha256_file(package_path)?;
    info!(
        path = %package_path.display(),
        size_bytes,
        sha256 = %sha256,
        "package ready"
    );
    Ok(PackageReport {
        platform_id: platform_id.to_string(),
        package_path: package_path.to_path_buf(),
        size_bytes,
        sha256,
    })
}

fn sha256_file(path: &Path) -> Result<(String, u64)> {
    let f = File::open(path).io_context(|| format!("opening '{}'", path.display()))?;
    let mut r = BufReader::new(f);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut size = 0u64;
    loop {
        let n = r
            .read(&mut buf)
            .io_context(|| format!("reading '{}'", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }
    Ok((format!("{:x}", hasher.finalize()), size))
}
