use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use oss_cad_suite_packager::{
    pipeline, platform, ArchiveFormat, BuildRequest, BuilderConfig, CommandUpstream,
    MetadataFormat,
};
use tracing_subscriber::EnvFilter;

/// Builds the Apio oss-cad-suite package for one platform.
#[derive(Parser)]
#[command(name = "oss-cad-suite-packager", version, about, long_about = None)]
struct Cli {
    /// Platform to build, e.g. darwin-arm64
    #[arg(
        long = "platform_id",
        visible_alias = "platform-id",
        required_unless_present = "list_platforms"
    )]
    platform_id: Option<String>,

    /// Package file name tag, e.g. 20250608
    #[arg(long, required_unless_present = "list_platforms")]
    package_tag: Option<String>,

    /// Build properties merged into the package
    #[arg(long = "build-info-json", visible_alias = "build-info")]
    build_info: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ArchiveArg::TarGz)]
    archive_format: ArchiveArg,

    #[arg(long, value_enum, default_value_t = MetadataArg::Json)]
    metadata_format: MetadataArg,

    /// TOML file overriding release settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding _upstream and _packages (default: current directory)
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Print supported platform ids and exit
    #[arg(long)]
    list_platforms: bool,

    /// More logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum ArchiveArg {
    TarGz,
    Zip,
}

impl From<ArchiveArg> for ArchiveFormat {
    fn from(arg: ArchiveArg) -> Self {
        match arg {
            ArchiveArg::TarGz => ArchiveFormat::TarGz,
            ArchiveArg::Zip => ArchiveFormat::Zip,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum MetadataArg {
    Json,
    Text,
}

impl From<MetadataArg> for MetadataFormat {
    fn from(arg: MetadataArg) -> Self {
        match arg {
            MetadataArg::Json => MetadataFormat::Json,
            MetadataArg::Text => MetadataFormat::Text,
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_platforms {
        for id in platform::supported_ids() {
            println!("{id}");
        }
        return Ok(());
    }

    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => BuilderConfig::load(path)
            .with_context(|| format!("loading config '{}'", path.display()))?,
        None => BuilderConfig::default(),
    };

    let work_dir = match cli.work_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("resolving current directory")?,
    };

    // clap enforces both unless --list-platforms, handled above.
    let platform_id = cli.platform_id.context("--platform_id is required")?;
    let package_tag = cli.package_tag.context("--package-tag is required")?;

    let request = BuildRequest {
        platform_id: platform_id.clone(),
        package_tag,
        build_info: cli.build_info,
        archive_format: cli.archive_format.into(),
        metadata_format: cli.metadata_format.into(),
    };

    let report = pipeline::run(&config, &work_dir, &request, &CommandUpstream)
        .with_context(|| format!("building package for '{platform_id}'"))?;

    println!(
        "[package:{}] {} ({} bytes, sha256 {})",
        report.platform_id,
        report.package_path.display(),
        report.size_bytes,
        report.sha256
    );
    Ok(())
}
