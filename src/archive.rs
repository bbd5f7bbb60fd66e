//! Output archive writers.
//!
//! Both writers walk the tree in sorted order, keep symlinks as links and
//! zero out timestamps and ownership, so the same tree always yields the
//! same bytes.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tar::Builder as TarBuilder;
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::{BuildError, IoContext, Result};

/// Format of the generated package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveFormat {
    #[default]
    TarGz,
    Zip,
}

impl ArchiveFormat {
    /// File name extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::Zip => "zip",
        }
    }
}

/// Archive the contents of `src_dir` (not the directory itself) into
/// `out_path`, overwriting any existing file.
pub fn create_archive(format: ArchiveFormat, src_dir: &Path, out_path: &Path) -> Result<()> {
    debug!(
        src = %src_dir.display(),
        out = %out_path.display(),
        format = format.extension(),
        "writing archive"
    );
    match format {
        ArchiveFormat::TarGz => create_tar_gz(src_dir, out_path),
        ArchiveFormat::Zip => create_zip(src_dir, out_path),
    }
}

/// Sorted entries under `src_dir` as (absolute path, archive-relative name).
fn collect_entries(src_dir: &Path) -> Result<Vec<(PathBuf, String)>> {
    let mut entries = Vec::new();
    for ent in WalkDir::new(src_dir).follow_links(false) {
        let ent = ent.map_err(|e| BuildError::Io {
            action: format!("walking '{}'", src_dir.display()),
            source: e.into(),
        })?;
        let p = ent.path();
        if p == src_dir {
            continue;
        }
        let rel = p
            .strip_prefix(src_dir)
            .unwrap_or(p)
            .to_string_lossy()
            .replace('\\', "/");
        entries.push((p.to_path_buf(), rel));
    }
    entries.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(entries)
}

#[cfg(unix)]
fn mode_of(md: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    md.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(md: &fs::Metadata) -> u32 {
    if md.is_dir() {
        0o755
    } else if md.file_type().is_symlink() {
        0o777
    } else {
        0o644
    }
}

fn new_header(entry_type: tar::EntryType, size: u64, mode: u32) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_size(size);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mode(mode);
    header
}

/// Write a gzip-compressed tarball.
pub fn create_tar_gz(src_dir: &Path, out_path: &Path) -> Result<()> {
    let out = File::create(out_path)
        .io_context(|| format!("creating archive '{}'", out_path.display()))?;
    let encoder = GzEncoder::new(out, Compression::default());
    let mut builder = TarBuilder::new(encoder);
    let appending = |rel: &str| format!("adding '{}' to '{}'", rel, out_path.display());

    for (p, rel) in collect_entries(src_dir)? {
        let md = fs::symlink_metadata(&p)
            .io_context(|| format!("reading metadata of '{}'", p.display()))?;

        if md.is_dir() {
            let mut header = new_header(tar::EntryType::Directory, 0, mode_of(&md));
            header.set_cksum();
            builder
                .append_data(&mut header, &rel, io::empty())
                .io_context(|| appending(&rel))?;
        } else if md.file_type().is_symlink() {
            let target = fs::read_link(&p)
                .io_context(|| format!("reading link '{}'", p.display()))?;
            let mut header = new_header(tar::EntryType::Symlink, 0, mode_of(&md));
            // append_link emits a GNU long-link entry for targets over 100 bytes
            builder
                .append_link(&mut header, &rel, &target)
                .io_context(|| appending(&rel))?;
        } else if md.is_file() {
            let mut f =
                File::open(&p).io_context(|| format!("opening '{}'", p.display()))?;
            let mut header = new_header(tar::EntryType::Regular, md.len(), mode_of(&md));
            header.set_cksum();
            builder
                .append_data(&mut header, &rel, &mut f)
                .io_context(|| appending(&rel))?;
        }
    }

    let encoder = builder
        .into_inner()
        .io_context(|| format!("finalizing tar stream '{}'", out_path.display()))?;
    encoder
        .finish()
        .io_context(|| format!("finishing gzip stream '{}'", out_path.display()))?;
    Ok(())
}

fn zip_options(mode: u32) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(mode)
}

/// Write a deflate-compressed zip archive.
pub fn create_zip(src_dir: &Path, out_path: &Path) -> Result<()> {
    let zip_err = |e: zip::result::ZipError| BuildError::Packaging {
        path: out_path.to_path_buf(),
        reason: e.to_string(),
    };

    let out = File::create(out_path)
        .io_context(|| format!("creating archive '{}'", out_path.display()))?;
    let mut zip = ZipWriter::new(out);

    for (p, rel) in collect_entries(src_dir)? {
        let md = fs::symlink_metadata(&p)
            .io_context(|| format!("reading metadata of '{}'", p.display()))?;
        let options = zip_options(mode_of(&md));

        if md.is_dir() {
            zip.add_directory(rel.as_str(), options).map_err(zip_err)?;
        } else if md.file_type().is_symlink() {
            let target = fs::read_link(&p)
                .io_context(|| format!("reading link '{}'", p.display()))?;
            let target = target.to_string_lossy().replace('\\', "/");
            zip.add_symlink(rel.as_str(), target.as_str(), options)
                .map_err(zip_err)?;
        } else if md.is_file() {
            let options = options.large_file(md.len() >= u64::from(u32::MAX));
            zip.start_file(rel.as_str(), options).map_err(zip_err)?;
            let mut f =
                File::open(&p).io_context(|| format!("opening '{}'", p.display()))?;
            io::copy(&mut f, &mut zip)
                .io_context(|| format!("adding '{}' to '{}'", rel, out_path.display()))?;
        }
    }

    zip.finish().map_err(zip_err)?;
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn fixture(root: &Path) {
        fs::create_dir_all(root.join("bin")).unwrap();
        fs::create_dir_all(root.join("lib")).unwrap();
        fs::write(root.join("bin/yosys"), "#!/bin/sh\n").unwrap();
        fs::set_permissions(root.join("bin/yosys"), fs::Permissions::from_mode(0o755)).unwrap();
        fs::write(root.join("lib/libfoo.so.1"), "elf").unwrap();
        std::os::unix::fs::symlink("libfoo.so.1", root.join("lib/libfoo.so")).unwrap();
    }

    #[test]
    fn test_tar_gz_keeps_symlinks_and_modes() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("pkg");
        fixture(&src);
        let out = temp.path().join("out.tar.gz");

        create_archive(ArchiveFormat::TarGz, &src, &out).unwrap();

        let mut archive = tar::Archive::new(GzDecoder::new(File::open(&out).unwrap()));
        let mut seen = Vec::new();
        for entry in archive.entries().unwrap() {
            let entry = entry.unwrap();
            let path = entry
                .path()
                .unwrap()
                .to_string_lossy()
                .trim_end_matches('/')
                .to_string();
            match path.as_str() {
                "lib/libfoo.so" => {
                    assert_eq!(entry.header().entry_type(), tar::EntryType::Symlink);
                    assert_eq!(
                        entry.link_name().unwrap().unwrap().to_string_lossy(),
                        "libfoo.so.1"
                    );
                }
                "bin/yosys" => {
                    assert_eq!(entry.header().mode().unwrap() & 0o111, 0o111);
                }
                _ => {}
            }
            seen.push(path);
        }
        assert_eq!(
            seen,
            vec!["bin", "bin/yosys", "lib", "lib/libfoo.so", "lib/libfoo.so.1"]
        );
    }

    #[test]
    fn test_tar_gz_long_symlink_target() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("pkg");
        fs::create_dir_all(src.join("lib")).unwrap();
        let target = format!("../{}/libthing.so.1", "nested-runtime-dir/".repeat(7));
        assert!(target.len() > 100);
        std::os::unix::fs::symlink(&target, src.join("lib/libthing.so")).unwrap();
        let out = temp.path().join("out.tar.gz");

        create_tar_gz(&src, &out).unwrap();

        let mut archive = tar::Archive::new(GzDecoder::new(File::open(&out).unwrap()));
        let link = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap())
            .find(|e| e.header().entry_type() == tar::EntryType::Symlink)
            .unwrap();
        assert_eq!(link.path().unwrap(), Path::new("lib/libthing.so"));
        assert_eq!(
            link.link_name().unwrap().unwrap().to_string_lossy(),
            target
        );
    }

    #[test]
    fn test_tar_gz_is_deterministic() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("pkg");
        fixture(&src);
        let a = temp.path().join("a.tar.gz");
        let b = temp.path().join("b.tar.gz");

        create_tar_gz(&src, &a).unwrap();
        create_tar_gz(&src, &b).unwrap();

        assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
    }

    #[test]
    fn test_zip_contents() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("pkg");
        fixture(&src);
        let out = temp.path().join("out.zip");

        create_archive(ArchiveFormat::Zip, &src, &out).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        {
            let mut yosys = archive.by_name("bin/yosys").unwrap();
            assert_eq!(yosys.unix_mode().unwrap() & 0o111, 0o111);
            let mut body = String::new();
            yosys.read_to_string(&mut body).unwrap();
            assert_eq!(body, "#!/bin/sh\n");
        }
        {
            let mut link = archive.by_name("lib/libfoo.so").unwrap();
            let mut target = String::new();
            link.read_to_string(&mut target).unwrap();
            assert_eq!(target, "libfoo.so.1");
        }
    }

    #[test]
    fn test_extensions() {
        assert_eq!(ArchiveFormat::TarGz.extension(), "tar.gz");
        assert_eq!(ArchiveFormat::Zip.extension(), "zip");
        assert_eq!(ArchiveFormat::default(), ArchiveFormat::TarGz);
    }
}
