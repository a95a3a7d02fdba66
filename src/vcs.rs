//! Normalization of VCS build settings into a fixed record.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use crate::build_info::BuildSetting;

pub const KEY_VCS: &str = "vcs";
pub const KEY_REVISION: &str = "vcs.revision";
pub const KEY_TIME: &str = "vcs.time";
pub const KEY_MODIFIED: &str = "vcs.modified";

const UNKNOWN: &str = "unknown";

/// Repository state a binary was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsInfo {
    pub vcs: String,
    pub revision: String,
    pub is_dirty: bool,
    pub last_commit: Option<DateTime<Utc>>,
}

impl Default for VcsInfo {
    fn default() -> Self {
        Self {
            vcs: UNKNOWN.to_string(),
            revision: UNKNOWN.to_string(),
            is_dirty: false,
            last_commit: None,
        }
    }
}

impl VcsInfo {
    /// Folds `settings` in order; a later duplicate key overwrites an earlier one.
    ///
    /// Unknown keys are ignored and an unparseable `vcs.time` keeps the prior
    /// value, so this never fails.
    pub fn from_settings<'a, I>(settings: I) -> Self
    where
        I: IntoIterator<Item = &'a BuildSetting>,
    {
        let mut info = Self::default();

        for setting in settings {
            match setting.key.as_str() {
                KEY_VCS => info.vcs = setting.value.clone(),
                KEY_REVISION => info.revision = setting.value.clone(),
                KEY_TIME => match DateTime::parse_from_rfc3339(&setting.value) {
                    Ok(time) => info.last_commit = Some(time.with_timezone(&Utc)),
                    Err(err) => debug!(value = %setting.value, %err, "ignoring vcs.time"),
                },
                KEY_MODIFIED => info.is_dirty = setting.value == "true",
                _ => {}
            }
        }

        info
    }

    /// Encodes the record back into settings that normalize to itself.
    pub fn to_settings(&self) -> Vec<BuildSetting> {
        let mut settings = vec![
            BuildSetting::new(KEY_VCS, &self.vcs),
            BuildSetting::new(KEY_REVISION, &self.revision),
            BuildSetting::new(KEY_MODIFIED, self.is_dirty.to_string()),
        ];

        if let Some(time) = self.last_commit {
            settings.push(BuildSetting::new(
                KEY_TIME,
                time.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ));
        }

        settings
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Vec<BuildSetting> {
        pairs.iter().map(|(k, v)| BuildSetting::new(*k, *v)).collect()
    }

    #[test]
    fn test_empty_settings_are_defaults() {
        let info = VcsInfo::from_settings(&[] as &[BuildSetting]);
        assert_eq!(info, VcsInfo::default());
        assert_eq!(info.vcs, "unknown");
        assert_eq!(info.revision, "unknown");
    }

    #[test]
    fn test_modified_only() {
        let info = VcsInfo::from_settings(&settings(&[("vcs.modified", "true")]));
        assert_eq!(
            info,
            VcsInfo {
                vcs: "unknown".to_string(),
                revision: "unknown".to_string(),
                is_dirty: true,
                last_commit: None,
            }
        );
    }

    #[test]
    fn test_full_settings() {
        let info = VcsInfo::from_settings(&settings(&[
            ("GOOS", "linux"),
            ("vcs", "git"),
            ("vcs.revision", "0123456789abcdef"),
            ("vcs.time", "2023-01-05T13:00:00+01:00"),
            ("vcs.modified", "false"),
        ]));

        assert_eq!(info.vcs, "git");
        assert_eq!(info.revision, "0123456789abcdef");
        assert!(!info.is_dirty);
        assert_eq!(
            info.last_commit,
            Some(Utc.with_ymd_and_hms(2023, 1, 5, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_modified_requires_literal_true() {
        for value in ["TRUE", "1", "yes", ""] {
            let info = VcsInfo::from_settings(&settings(&[("vcs.modified", value)]));
            assert!(!info.is_dirty, "{value:?} must not mark the tree dirty");
        }
    }

    #[test]
    fn test_later_duplicate_wins() {
        let info = VcsInfo::from_settings(&settings(&[
            ("vcs.revision", "first"),
            ("vcs.modified", "true"),
            ("vcs.revision", "second"),
            ("vcs.modified", "false"),
        ]));
        assert_eq!(info.revision, "second");
        assert!(!info.is_dirty);
    }

    #[test]
    fn test_bad_time_keeps_prior_value() {
        let info = VcsInfo::from_settings(&settings(&[
            ("vcs.time", "2023-01-05T12:00:00Z"),
            ("vcs.time", "yesterday"),
        ]));
        assert_eq!(
            info.last_commit,
            Some(Utc.with_ymd_and_hms(2023, 1, 5, 12, 0, 0).unwrap())
        );

        let info = VcsInfo::from_settings(&settings(&[("vcs.time", "20230105120000")]));
        assert_eq!(info.last_commit, None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let info = VcsInfo::from_settings(&settings(&[
            ("vcs", "git"),
            ("vcs.revision", "abc"),
            ("vcs.time", "2023-01-05T12:00:00.5-07:00"),
            ("vcs.modified", "true"),
        ]));
        assert_eq!(VcsInfo::from_settings(&info.to_settings()), info);

        let defaults = VcsInfo::default();
        assert_eq!(VcsInfo::from_settings(&defaults.to_settings()), defaults);
    }
}
