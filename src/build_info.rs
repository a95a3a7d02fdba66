//! Build metadata of a binary and the sources it can be read from.

use std::{fmt, str::FromStr};

use snafu::Snafu;

use crate::vcs::{KEY_MODIFIED, KEY_REVISION, KEY_TIME, KEY_VCS};

/// One free-form `key=value` build setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSetting {
    pub key: String,
    pub value: String,
}

impl BuildSetting {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for BuildSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(display("expected KEY=VALUE, got `{input}`"))]
pub struct InvalidSetting {
    pub input: String,
}

impl FromStr for BuildSetting {
    type Err = InvalidSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok(Self::new(key, value)),
            _ => Err(InvalidSetting {
                input: s.to_string(),
            }),
        }
    }
}

/// Everything a binary knows about how it was built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildInfo {
    /// Module path, e.g. `github.com/owner/app`.
    pub path: String,
    /// Version identifier of the main module.
    pub main_version: String,
    pub toolchain_version: String,
    pub settings: Vec<BuildSetting>,
}

/// Where a [`crate::report::Reporter`] reads build metadata from.
pub trait BuildInfoSource {
    /// Returns `None` when no metadata is available.
    fn read_build_info(&self) -> Option<BuildInfo>;
}

impl BuildInfoSource for BuildInfo {
    fn read_build_info(&self) -> Option<BuildInfo> {
        Some(self.clone())
    }
}

impl<T: BuildInfoSource + ?Sized> BuildInfoSource for &T {
    fn read_build_info(&self) -> Option<BuildInfo> {
        (**self).read_build_info()
    }
}

/// Metadata embedded into this binary by `build.rs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedBuildInfo;

impl BuildInfoSource for EmbeddedBuildInfo {
    fn read_build_info(&self) -> Option<BuildInfo> {
        let path = env!("VERINFO_MODULE_PATH");
        if path.is_empty() {
            return None;
        }

        // Settings the build script could not determine are left out
        let settings = [
            (KEY_VCS, env!("VERINFO_VCS")),
            (KEY_REVISION, env!("VERINFO_VCS_REVISION")),
            (KEY_TIME, env!("VERINFO_VCS_TIME")),
            (KEY_MODIFIED, env!("VERINFO_VCS_MODIFIED")),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| BuildSetting::new(key, value))
        .collect();

        Some(BuildInfo {
            path: path.to_string(),
            main_version: env!("VERINFO_MAIN_VERSION").to_string(),
            toolchain_version: env!("VERINFO_TOOLCHAIN").to_string(),
            settings,
        })
    }
}
