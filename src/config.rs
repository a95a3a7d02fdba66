//
// ──────────────────────────────────────────────────────────────────────────────
//  CONFIGURATION STRUCTURES
// ──────────────────────────────────────────────────────────────────────────────
//
// These structs mirror the YAML schema of verinfo.yaml so that serde_yml can
// deserialize directly into them.
//
// ArgumentSpec: describes a single argument for a Rhai filter function.
// FilterSpec: a Rhai function exposed to templates as a MiniJinja filter.
// RootConfig: template overrides, time zone and filters.
//

use std::{fs, path::Path};

use serde::Deserialize;
use snafu::ResultExt;
use tracing::debug;
use verinfo_errors::{ConfigReadSnafu, VerError, VerResult, span_of};

/// File looked up in the current directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "verinfo.yaml";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ArgumentSpec {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilterSpec {
    // Rhai function name, also the filter name inside templates.
    pub function: String,

    #[serde(default)]
    pub arguments: Vec<ArgumentSpec>,

    // Rhai function body.
    #[serde(default)]
    pub script: String,
}

/// Zone used when formatting the commit time.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeZoneChoice {
    #[default]
    Local,
    Utc,
}

#[derive(Debug, Deserialize, Default)]
pub struct RootConfig {
    // Brief template override.
    #[serde(default)]
    pub brief: Option<String>,

    // Detail template override.
    #[serde(default)]
    pub detail: Option<String>,

    #[serde(default)]
    pub time_zone: TimeZoneChoice,

    #[serde(default)]
    pub filters: Vec<FilterSpec>,
}

impl RootConfig {
    pub fn from_yaml(path: &str, yaml: &str) -> VerResult<Self> {
        // An empty document deserializes as null, which means "no overrides"
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yml::from_str(yaml).map_err(|err| {
            let last = yaml.len().saturating_sub(1);
            let offset = err.location().map(|loc| loc.index().min(last));
            VerError::ConfigParse {
                path: path.to_string(),
                reason: err.to_string(),
                src: miette::NamedSource::new(path, yaml.to_string()),
                span: span_of(offset.map(|start| start..start + 1)),
            }
        })
    }

    pub fn load(path: &Path) -> VerResult<Self> {
        let shown = path.display().to_string();
        let yaml = fs::read_to_string(path).context(ConfigReadSnafu {
            path: shown.clone(),
        })?;

        debug!(path = %shown, "loaded config");
        Self::from_yaml(&shown, &yaml)
    }

    /// Loads `explicit` if given, else `verinfo.yaml` when it exists, else defaults.
    pub fn discover(explicit: Option<&Path>) -> VerResult<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}
