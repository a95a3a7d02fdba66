//! Classify module build identifiers and report how a binary relates to its
//! tag history.

pub mod build_info;
pub mod config;
pub mod filters;
pub mod report;
pub mod vcs;
pub mod version;

pub use build_info::{BuildInfo, BuildInfoSource, BuildSetting, EmbeddedBuildInfo};
pub use config::RootConfig;
pub use report::Reporter;
pub use vcs::VcsInfo;
pub use version::{Classification, MalformedVersion, ModVersion};
