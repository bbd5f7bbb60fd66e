//! Preflight checks for host tools.
//!
//! Downloading and extracting shell out to host programs. Checking for them
//! before the download avoids fetching a large asset only to fail on a
//! missing `7z`.
//!
//! # Example
//!
//! ```rust
//! use oss_cad_suite_packager::preflight::{command_exists, check_required_tools};
//!
//! if !command_exists("wget") {
//!     println!("wget not installed");
//! }
//!
//! let tools = &[("tar", "tar"), ("7z", "p7zip")];
//! if let Err(e) = check_required_tools(tools) {
//!     eprintln!("{}", e);
//! }
//! ```

use crate::error::{BuildError, Result};
use crate::platform::PlatformConfig;

/// Check if a command exists on the host's `PATH`.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Package that provides a given tool, for the error hint.
fn package_for(tool: &str) -> &'static str {
    match tool {
        "wget" => "wget",
        "tar" => "tar",
        "7z" => "p7zip (macOS: brew install p7zip)",
        _ => "unknown",
    }
}

/// Tools a download-and-extract run needs for `platform`.
///
/// Each tuple is (command_name, package_name).
pub fn tools_for(platform: &PlatformConfig) -> Vec<(&'static str, &'static str)> {
    let extract = platform.extract_program();
    vec![("wget", package_for("wget")), (extract, package_for(extract))]
}

/// Check that specific tools are available.
///
/// # Returns
///
/// * `Ok(())` if all tools are found
/// * `Err` listing every missing tool and its package
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<_> = tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool))
        .collect();

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (install: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        return Err(BuildError::Configuration(format!(
            "missing required host tools:\n{}",
            msg
        )));
    }

    Ok(())
}
