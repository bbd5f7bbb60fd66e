//! Packaging routine.
//!
//! One routine serves every platform; the platform record supplies the
//! binaries and library that must be present.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::config::BuilderConfig;
use crate::error::{BuildError, IoContext, Result};
use crate::platform::PlatformConfig;

/// Copy the extracted upstream tree into the (empty) package directory and
/// validate the result.
pub fn package(
    platform: &PlatformConfig,
    config: &BuilderConfig,
    source_dir: &Path,
    dest_dir: &Path,
) -> Result<()> {
    info!(
        platform = platform.id,
        source = %source_dir.display(),
        dest = %dest_dir.display(),
        "packaging"
    );

    if dir_is_empty(source_dir)? {
        return Err(BuildError::validation(source_dir, "source directory is empty"));
    }
    if !dir_is_empty(dest_dir)? {
        return Err(BuildError::validation(
            dest_dir,
            "package directory is not empty",
        ));
    }

    copy_dir_recursive(source_dir, dest_dir)?;
    rename_version_marker(config, dest_dir)?;
    check_package_executables(dest_dir, platform.required_executables)?;

    if let Some(lib) = platform.required_library {
        let path = dest_dir.join(lib);
        debug!(path = %path.display(), "checking library");
        if !path.is_file() {
            return Err(BuildError::validation(path, "required library is missing"));
        }
    }

    Ok(())
}

fn dir_is_empty(dir: &Path) -> Result<bool> {
    let mut entries =
        fs::read_dir(dir).io_context(|| format!("reading directory '{}'", dir.display()))?;
    Ok(entries.next().is_none())
}

/// Recursively copy a directory, preserving symlinks.
///
/// Symbolic links are recreated, not followed. File and directory
/// permissions are kept.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    if !dst.exists() {
        fs::create_dir_all(dst)
            .io_context(|| format!("creating directory '{}'", dst.display()))?;
    }

    for entry in
        fs::read_dir(src).io_context(|| format!("reading directory '{}'", src.display()))?
    {
        let entry = entry.io_context(|| format!("reading entry under '{}'", src.display()))?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let file_type = entry
            .file_type()
            .io_context(|| format!("reading file type of '{}'", src_path.display()))?;

        if file_type.is_symlink() {
            copy_symlink(&src_path, &dst_path)?;
        } else if file_type.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path).io_context(|| {
                format!(
                    "copying '{}' to '{}'",
                    src_path.display(),
                    dst_path.display()
                )
            })?;
        }
    }

    // Applied after the children so a read-only source dir still copies.
    let perms = fs::metadata(src)
        .io_context(|| format!("reading metadata of '{}'", src.display()))?
        .permissions();
    fs::set_permissions(dst, perms)
        .io_context(|| format!("setting permissions on '{}'", dst.display()))?;

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let target =
        fs::read_link(src).io_context(|| format!("reading link '{}'", src.display()))?;
    if dst.exists() || dst.is_symlink() {
        fs::remove_file(dst).io_context(|| format!("removing '{}'", dst.display()))?;
    }
    std::os::unix::fs::symlink(&target, dst)
        .io_context(|| format!("creating symlink '{}'", dst.display()))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    if src.is_dir() {
        return copy_dir_recursive(src, dst);
    }
    fs::copy(src, dst)
        .map(|_| ())
        .io_context(|| format!("copying '{}' to '{}'", src.display(), dst.display()))
}

/// Rename the upstream version marker so it cannot collide with our own
/// metadata files. A tree without the marker is left as is.
fn rename_version_marker(config: &BuilderConfig, dest_dir: &Path) -> Result<()> {
    let marker = dest_dir.join(&config.version_marker);
    if !marker.exists() {
        debug!(marker = %marker.display(), "no version marker");
        return Ok(());
    }
    let renamed = dest_dir.join(&config.renamed_version_marker);
    fs::rename(&marker, &renamed).io_context(|| {
        format!(
            "renaming '{}' -> '{}'",
            marker.display(),
            renamed.display()
        )
    })
}

/// Check that every listed file exists and is executable.
///
/// Stops at the first failure and names that path.
pub fn check_package_executables(package_dir: &Path, executables: &[&str]) -> Result<()> {
    for bin_file in executables {
        let path = package_dir.join(bin_file);
        debug!(path = %path.display(), "checking executable");
        if !path.is_file() {
            return Err(BuildError::validation(path, "required executable is missing"));
        }
        if !is_executable(&path)? {
            return Err(BuildError::validation(
                path,
                "required executable lacks the executable bit",
            ));
        }
    }
    Ok(())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> Result<bool> {
    use std::os::unix::fs::PermissionsExt;
    let md = fs::metadata(path)
        .io_context(|| format!("reading metadata of '{}'", path.display()))?;
    Ok(md.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> Result<bool> {
    Ok(true)
}
