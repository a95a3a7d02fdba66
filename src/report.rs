//! Human-readable version report combining [`ModVersion`] and [`VcsInfo`].
//!
//! The brief template is always rendered. The detail template is compiled and
//! rendered only when the binary is not a release or pre-release build; its
//! context carries the VCS state reconciled with what the version identifier
//! encodes.

use std::{io::Write, path::Path};

use chrono::{DateTime, Local, SecondsFormat, Utc};
use minijinja::Environment;
use serde::Serialize;
use snafu::ResultExt;
use tracing::{debug, warn};
use verinfo_errors::{OutputSnafu, VerError, VerResult, span_of};

use crate::{
    build_info::{BuildInfo, BuildInfoSource, BuildSetting},
    config::{RootConfig, TimeZoneChoice},
    filters::{self, ScriptFilters},
    vcs::VcsInfo,
    version::ModVersion,
};

pub const DEFAULT_BRIEF: &str =
    "{{ app_name }} version {{ app_version }}, built with {{ toolchain_version }}\n";

pub const DEFAULT_DETAIL: &str = "\
WARNING! This is not a release version, it's built from a {{ tag_remarks }}.

VCS information:
VCS:         {{ vcs }}
Module path: {{ module_path }}
Commit time: {{ last_commit }}
Revision id: {{ revision }}

Please visit {{ module_path }} to get updates.
";

/// Written instead of a report when the source has no build info.
pub const NO_BUILD_INFO: &str = "Can't get build info.";

const BRIEF: &str = "brief";
const DETAIL: &str = "detail";

/// Context of the brief template.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Brief {
    pub app_name: String,
    pub module_path: String,
    pub app_version: String,
    pub toolchain_version: String,
}

impl Brief {
    pub fn from_build_info(info: &BuildInfo) -> Self {
        let app_name = Path::new(&info.path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| info.path.clone());

        Self {
            app_name,
            module_path: info.path.clone(),
            app_version: info.main_version.clone(),
            toolchain_version: info.toolchain_version.clone(),
        }
    }
}

/// Context of the detail template.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Detail {
    #[serde(flatten)]
    pub brief: Brief,
    pub kind: String,
    pub tag: Option<String>,
    pub commit_id: Option<String>,
    pub vcs: String,
    pub revision: String,
    pub is_dirty: bool,
    pub last_commit: String,
    pub last_commit_rfc3339: Option<String>,
    pub tag_remarks: String,
}

/// Why a build is not a clean release, or `None` for release builds.
pub fn tag_remarks(version: &ModVersion, vcs: &VcsInfo) -> Option<String> {
    let remarks = match version {
        ModVersion::Release | ModVersion::PreRelease => return None,
        ModVersion::Error => "unknown branch".to_string(),
        ModVersion::Devel if vcs.is_dirty => "dirty working copy".to_string(),
        ModVersion::Devel => "clean working copy".to_string(),
        ModVersion::PseudoUntagged { .. } => "untagged branch".to_string(),
        ModVersion::PseudoBaseRelease { tag, .. }
        | ModVersion::PseudoBasePreRelease { tag, .. } => format!("branch based on tag {tag}"),
    };

    Some(remarks)
}

/// Replaces the VCS revision and commit time with the ones a pseudo-version
/// encodes. Other versions leave `vcs` untouched.
pub fn reconcile(version: &ModVersion, mut vcs: VcsInfo) -> VcsInfo {
    if let (Some(commit_id), Some(time)) = (version.commit_id(), version.time()) {
        vcs.revision = commit_id.to_string();
        vcs.last_commit = Some(time);
    }

    vcs
}

/// Template sources and formatting choices.
///
/// `last_commit` is formatted as `%Y-%m-%d %H:%M:%S %Z`. Under
/// [`TimeZoneChoice::Utc`] the zone reads `UTC`; under
/// [`TimeZoneChoice::Local`] it is the numeric offset (`+01:00`), since the
/// local zone carries no abbreviation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    pub brief: String,
    pub detail: String,
    pub time_zone: TimeZoneChoice,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            brief: DEFAULT_BRIEF.to_string(),
            detail: DEFAULT_DETAIL.to_string(),
            time_zone: TimeZoneChoice::Local,
        }
    }
}

impl Templates {
    pub fn from_config(config: &RootConfig) -> Self {
        let defaults = Self::default();
        Self {
            brief: config.brief.clone().unwrap_or(defaults.brief),
            detail: config.detail.clone().unwrap_or(defaults.detail),
            time_zone: config.time_zone,
        }
    }

    fn format_time(&self, time: Option<DateTime<Utc>>) -> String {
        const LAYOUT: &str = "%Y-%m-%d %H:%M:%S %Z";

        match (time, self.time_zone) {
            (None, _) => "unknown".to_string(),
            (Some(t), TimeZoneChoice::Utc) => t.format(LAYOUT).to_string(),
            (Some(t), TimeZoneChoice::Local) => t.with_timezone(&Local).format(LAYOUT).to_string(),
        }
    }
}

/// Renders version reports for the build info of an injected source.
pub struct Reporter<S> {
    source: S,
    templates: Templates,
    filters: Option<ScriptFilters>,
}

impl<S: BuildInfoSource> Reporter<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            templates: Templates::default(),
            filters: None,
        }
    }

    pub fn with_templates(mut self, templates: Templates) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_filters(mut self, filters: ScriptFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Builds a reporter from a loaded configuration, compiling its filters.
    pub fn from_config(source: S, config: &RootConfig) -> VerResult<Self> {
        let reporter = Self::new(source).with_templates(Templates::from_config(config));

        if config.filters.is_empty() {
            return Ok(reporter);
        }

        Ok(reporter.with_filters(ScriptFilters::compile(&config.filters)?))
    }

    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    /// Classifies `identifier`, or the source's main version when it is empty.
    ///
    /// `None` when the identifier is empty and the source has no build info.
    pub fn app_version(&self, identifier: &str) -> Option<ModVersion> {
        let version = if identifier.is_empty() {
            self.source.read_build_info()?.main_version
        } else {
            identifier.to_string()
        };

        Some(classify_or_error(&version))
    }

    /// Normalizes `settings`, or the source's settings when absent.
    pub fn vcs_info(&self, settings: Option<&[BuildSetting]>) -> Option<VcsInfo> {
        match settings {
            Some(settings) => Some(VcsInfo::from_settings(settings)),
            None => Some(VcsInfo::from_settings(&self.source.read_build_info()?.settings)),
        }
    }

    /// Writes the brief line and, for non-release builds, the detail block.
    pub fn write_version<W: Write>(&self, w: &mut W) -> VerResult<()> {
        let Some(info) = self.source.read_build_info() else {
            writeln!(w, "{NO_BUILD_INFO}").context(OutputSnafu)?;
            return Ok(());
        };

        let mut env = self.environment();
        add_template(&mut env, BRIEF, &self.templates.brief)?;
        let brief = Brief::from_build_info(&info);
        write_rendered(&env, BRIEF, &brief, w)?;

        let version = classify_or_error(&info.main_version);
        let vcs = VcsInfo::from_settings(&info.settings);

        let Some(remarks) = tag_remarks(&version, &vcs) else {
            debug!(kind = %version.classification(), "release build, skipping detail");
            return Ok(());
        };

        add_template(&mut env, DETAIL, &self.templates.detail)?;
        let vcs = reconcile(&version, vcs);
        let detail = Detail {
            brief,
            kind: version.classification().to_string(),
            tag: version.tag().map(str::to_string),
            commit_id: version.commit_id().map(str::to_string),
            last_commit: self.templates.format_time(vcs.last_commit),
            last_commit_rfc3339: vcs
                .last_commit
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            vcs: vcs.vcs,
            revision: vcs.revision,
            is_dirty: vcs.is_dirty,
            tag_remarks: remarks,
        };

        write_rendered(&env, DETAIL, &detail, w)
    }

    /// Renders the report into a string.
    pub fn render(&self) -> VerResult<String> {
        let mut out = Vec::new();
        self.write_version(&mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn environment(&self) -> Environment<'_> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);

        filters::register_builtin(&mut env);
        if let Some(script_filters) = &self.filters {
            script_filters.register(&mut env);
        }

        env
    }
}

fn add_template<'s>(
    env: &mut Environment<'s>,
    name: &'static str,
    source: &'s str,
) -> VerResult<()> {
    env.add_template(name, source)
        .map_err(|err| VerError::TemplateSyntax {
            name: name.to_string(),
            reason: err.to_string(),
            src: miette::NamedSource::new(name, source.to_string()),
            span: span_of(err.range()),
        })
}

fn classify_or_error(identifier: &str) -> ModVersion {
    ModVersion::parse(identifier).unwrap_or_else(|err| {
        warn!(%err, "treating version as unknown");
        ModVersion::Error
    })
}

fn write_rendered<T: Serialize, W: Write>(
    env: &Environment<'_>,
    name: &str,
    ctx: &T,
    w: &mut W,
) -> VerResult<()> {
    let rendered = env
        .get_template(name)
        .and_then(|tmpl| tmpl.render(ctx))
        .map_err(|err| VerError::TemplateRender {
            name: name.to_string(),
            reason: err.to_string(),
        })?;

    w.write_all(rendered.as_bytes()).context(OutputSnafu)
}
