//! Build-info metadata merged into the package.
//!
//! The caller supplies a build-info file (CI run id, repo commit, ...); we add
//! the fields only this run knows and write the result into the package
//! root. JSON is the default; the older key=value text form is still
//! supported.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{BuildError, IoContext, Result};

/// Output format of the build-info file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataFormat {
    /// `build-info.json`, keys `target-platform`, `yosys-tag`, `file-name`.
    #[default]
    Json,
    /// `BUILD-INFO`, lines `platform-id=...` and `yosys-tag=...`.
    Text,
}

impl MetadataFormat {
    /// Name of the file written into the package root.
    pub fn file_name(self) -> &'static str {
        match self {
            MetadataFormat::Json => "build-info.json",
            MetadataFormat::Text => "BUILD-INFO",
        }
    }
}

/// Fields computed by the run.
#[derive(Debug, Clone, Copy)]
pub struct BuildProperties<'a> {
    pub platform_id: &'a str,
    pub yosys_tag: &'a str,
    pub file_name: &'a str,
}

/// Fail unless `path` names an existing regular file.
pub fn check_input(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(BuildError::metadata(path, "build-info file does not exist"));
    }
    if !path.is_file() {
        return Err(BuildError::metadata(path, "build-info path is not a file"));
    }
    Ok(())
}

/// Merge `props` into the build-info at `input` and write it into `dest_dir`.
///
/// Returns the path of the written file.
pub fn write_build_info(
    format: MetadataFormat,
    input: &Path,
    props: &BuildProperties<'_>,
    dest_dir: &Path,
) -> Result<PathBuf> {
    check_input(input)?;
    let text = fs::read_to_string(input)
        .map_err(|e| BuildError::metadata(input, format!("reading build-info: {e}")))?;

    let rendered = match format {
        MetadataFormat::Json => merge_json(&text, props),
        MetadataFormat::Text => merge_text(&text, props),
    }
    .map_err(|reason| BuildError::metadata(input, reason))?;

    let out = dest_dir.join(format.file_name());
    fs::write(&out, rendered).io_context(|| format!("writing '{}'", out.display()))?;
    info!(path = %out.display(), "wrote build info");
    Ok(out)
}

/// Add the run's fields to a JSON object.
///
/// Output is pretty-printed with two-space indentation and a trailing
/// newline. Keys come out sorted.
pub fn merge_json(input: &str, props: &BuildProperties<'_>) -> std::result::Result<String, String> {
    let mut value: Value =
        serde_json::from_str(input).map_err(|e| format!("parsing build-info JSON: {e}"))?;
    let obj = value
        .as_object_mut()
        .ok_or_else(|| "build-info JSON must be an object".to_string())?;

    obj.insert("target-platform".into(), props.platform_id.into());
    obj.insert("yosys-tag".into(), props.yosys_tag.into());
    obj.insert("file-name".into(), props.file_name.into());

    let mut out = serde_json::to_string_pretty(&value)
        .map_err(|e| format!("serializing build-info JSON: {e}"))?;
    out.push('\n');
    Ok(out)
}

const TEXT_KEYS: [&str; 2] = ["platform-id", "yosys-tag"];

/// Add the run's fields to key=value text.
///
/// Existing `platform-id` and `yosys-tag` lines are replaced. Blank lines
/// and `#` comments pass through; any other line must contain `=`.
pub fn merge_text(input: &str, props: &BuildProperties<'_>) -> std::result::Result<String, String> {
    let mut out = String::new();
    for (n, line) in input.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            out.push_str(line);
            out.push('\n');
            continue;
        }
        let Some((key, _)) = trimmed.split_once('=') else {
            return Err(format!("line {}: expected key=value, got '{}'", n + 1, trimmed));
        };
        if TEXT_KEYS.contains(&key.trim()) {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&format!("platform-id={}\n", props.platform_id));
    out.push_str(&format!("yosys-tag={}\n", props.yosys_tag));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn props() -> BuildProperties<'static> {
        BuildProperties {
            platform_id: "linux-x86-64",
            yosys_tag: "2025-06-08",
            file_name: "apio-oss-cad-suite-linux-x86-64-20250608.tar.gz",
        }
    }

    #[test]
    fn test_merge_json() {
        let out = merge_json(r#"{"repo": "fpgawars/tools-oss-cad-suite", "yosys-tag": "old"}"#, &props())
            .unwrap();
        assert!(out.ends_with("}\n"));
        assert!(out.contains("\n  \"repo\": \"fpgawars/tools-oss-cad-suite\""));

        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["target-platform"], "linux-x86-64");
        assert_eq!(parsed["yosys-tag"], "2025-06-08");
        assert_eq!(
            parsed["file-name"],
            "apio-oss-cad-suite-linux-x86-64-20250608.tar.gz"
        );
    }

    #[test]
    fn test_merge_json_rejects_non_object() {
        assert!(merge_json("[1, 2]", &props()).unwrap_err().contains("object"));
        assert!(merge_json("{", &props()).is_err());
    }

    #[test]
    fn test_merge_text() {
        let out = merge_text("# ci\nrun-id=42\nplatform-id=stale\n\n", &props()).unwrap();
        assert_eq!(
            out,
            "# ci\nrun-id=42\n\nplatform-id=linux-x86-64\nyosys-tag=2025-06-08\n"
        );
    }

    #[test]
    fn test_merge_text_rejects_garbage() {
        let err = merge_text("run-id=1\nnonsense\n", &props()).unwrap_err();
        assert!(err.contains("line 2"));
    }

    #[test]
    fn test_write_build_info() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in.json");
        fs::write(&input, "{\"run\": 7}").unwrap();
        let dest = temp.path().join("pkg");
        fs::create_dir_all(&dest).unwrap();

        let out = write_build_info(MetadataFormat::Json, &input, &props(), &dest).unwrap();
        assert_eq!(out, dest.join("build-info.json"));
        let first = fs::read_to_string(&out).unwrap();

        // Same inputs, same bytes.
        write_build_info(MetadataFormat::Json, &input, &props(), &dest).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), first);
    }

    #[test]
    fn test_missing_input() {
        let temp = TempDir::new().unwrap();
        let err = write_build_info(
            MetadataFormat::Text,
            &temp.path().join("missing"),
            &props(),
            temp.path(),
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::Metadata { .. }));

        let err = check_input(temp.path()).unwrap_err();
        assert!(err.to_string().contains("not a file"));
    }
}
