//! Repackages YosysHQ oss-cad-suite releases into Apio packages.
//!
//! One invocation builds the package for one platform:
//!
//! - **Platform registry** - which upstream asset and which files each
//!   platform needs
//! - **Pipeline** - download, extract, package, add build info, archive,
//!   clean up, verify
//! - **Packaging** - symlink-preserving copy plus executable checks
//!
//! # Architecture
//!
//! ```text
//! oss-cad-suite-packager (bin)
//!     │
//!     └── pipeline::run
//!             ├── platform::lookup      static registry
//!             ├── upstream::Upstream    wget + tar/7z (stubbed in tests)
//!             ├── package::package      copy + validate
//!             ├── metadata              build-info.json / BUILD-INFO
//!             └── archive               .tar.gz / .zip
//! ```
//!
//! Scratch space lives under `_upstream/<platform>` and
//! `_packages/<platform>` in the work directory; the deliverable is
//! `_packages/apio-oss-cad-suite-<platform>-<tag>.tar.gz`.
//!
//! # Example
//!
//! ```rust,no_run
//! use oss_cad_suite_packager::{pipeline, BuildRequest, BuilderConfig, CommandUpstream};
//! use std::path::Path;
//!
//! let request = BuildRequest::new("linux-x86-64", "20250608");
//! let report = pipeline::run(
//!     &BuilderConfig::default(),
//!     Path::new("."),
//!     &request,
//!     &CommandUpstream,
//! )?;
//! println!("{}", report.package_path.display());
//! # Ok::<(), oss_cad_suite_packager::BuildError>(())
//! ```

pub mod archive;
pub mod config;
pub mod context;
pub mod error;
pub mod metadata;
pub mod package;
pub mod pipeline;
pub mod platform;
pub mod preflight;
pub mod upstream;

pub use archive::ArchiveFormat;
pub use config::BuilderConfig;
pub use context::{BuildContext, BuildRequest};
pub use error::{BuildError, Result};
pub use metadata::MetadataFormat;
pub use pipeline::PackageReport;
pub use platform::PlatformConfig;
pub use upstream::{CommandUpstream, Upstream};
