//! Platform registry.
//!
//! Maps Apio platform ids to the upstream oss-cad-suite asset for that
//! platform and to the files a repackaged tree must contain. Entries are
//! authored here once and never change at runtime.

use crate::error::{BuildError, Result};

/// Kind of upstream release asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    /// Gzipped tarball.
    Tgz,
    /// Self-extracting 7z executable (Windows).
    Exe,
}

impl UpstreamKind {
    /// File extension of the upstream asset, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            UpstreamKind::Tgz => "tgz",
            UpstreamKind::Exe => "exe",
        }
    }
}

/// Static description of one supported platform.
#[derive(Debug)]
pub struct PlatformConfig {
    /// Apio platform id, e.g. `linux-x86-64`.
    pub id: &'static str,
    /// Platform fragment used in upstream asset names, e.g. `linux-x64`.
    pub upstream_platform: &'static str,
    pub upstream_kind: UpstreamKind,
    /// Extraction program and arguments; the archive file name is appended.
    pub extract_command: &'static [&'static str],
    /// Paths, relative to the package root, that must be executable files.
    pub required_executables: &'static [&'static str],
    /// Shared library that must be present, if any (libusb on macOS).
    pub required_library: Option<&'static str>,
}

impl PlatformConfig {
    /// Upstream asset file name for the given release tag.
    ///
    /// The release tag `2025-06-08` appears as `20250608` in asset names.
    pub fn upstream_file_name(&self, release_tag: &str) -> String {
        format!(
            "oss-cad-suite-{}-{}.{}",
            self.upstream_platform,
            release_tag.replace('-', ""),
            self.upstream_kind.extension()
        )
    }

    /// Program used to extract the upstream asset.
    pub fn extract_program(&self) -> &'static str {
        self.extract_command[0]
    }
}

const UNIX_EXECUTABLES: &[&str] = &[
    "bin/yosys",
    "bin/nextpnr-ice40",
    "bin/nextpnr-ecp5",
    "bin/nextpnr-himbaechel",
    "bin/dot",
    "bin/gtkwave",
];

const WINDOWS_EXECUTABLES: &[&str] = &[
    "bin/yosys.exe",
    "bin/nextpnr-ice40.exe",
    "bin/nextpnr-ecp5.exe",
    "bin/nextpnr-himbaechel.exe",
    "bin/gtkwave.exe",
];

const TAR_EXTRACT: &[&str] = &["tar", "zxf"];
const SEVEN_ZIP_EXTRACT: &[&str] = &["7z", "x"];

/// All supported platforms.
pub static PLATFORMS: &[PlatformConfig] = &[
    PlatformConfig {
        id: "darwin-arm64",
        upstream_platform: "darwin-arm64",
        upstream_kind: UpstreamKind::Tgz,
        extract_command: TAR_EXTRACT,
        required_executables: UNIX_EXECUTABLES,
        required_library: Some("lib/libusb-1.0.0.dylib"),
    },
    PlatformConfig {
        id: "darwin-x86-64",
        upstream_platform: "darwin-x64",
        upstream_kind: UpstreamKind::Tgz,
        extract_command: TAR_EXTRACT,
        required_executables: UNIX_EXECUTABLES,
        required_library: Some("lib/libusb-1.0.0.dylib"),
    },
    PlatformConfig {
        id: "linux-x86-64",
        upstream_platform: "linux-x64",
        upstream_kind: UpstreamKind::Tgz,
        extract_command: TAR_EXTRACT,
        required_executables: UNIX_EXECUTABLES,
        required_library: None,
    },
    PlatformConfig {
        id: "linux-aarch64",
        upstream_platform: "linux-arm64",
        upstream_kind: UpstreamKind::Tgz,
        extract_command: TAR_EXTRACT,
        required_executables: UNIX_EXECUTABLES,
        required_library: None,
    },
    PlatformConfig {
        id: "windows-amd64",
        upstream_platform: "windows-x64",
        upstream_kind: UpstreamKind::Exe,
        extract_command: SEVEN_ZIP_EXTRACT,
        required_executables: WINDOWS_EXECUTABLES,
        required_library: None,
    },
];

/// Look up a platform by its Apio id.
pub fn lookup(platform_id: &str) -> Result<&'static PlatformConfig> {
    PLATFORMS
        .iter()
        .find(|p| p.id == platform_id)
        .ok_or_else(|| {
            BuildError::Configuration(format!(
                "unsupported platform '{}'; expected one of: {}",
                platform_id,
                supported_ids().join(", ")
            ))
        })
}

/// Ids of all supported platforms, in registry order.
pub fn supported_ids() -> Vec<&'static str> {
    PLATFORMS.iter().map(|p| p.id).collect()
}
