//! Classification of module version identifiers.
//!
//! A module version identifier takes one of these layouts:
//!
//! * dirty or untracked working copy: `(devel)`
//! * release: `vX.Y.Z`, and any other identifier below three hyphen-delimited
//!   segments, `vX.Y.Z-RC1` included
//! * pseudo-version on an untagged branch: `v0.0.0-YYYYmmddHHMMSS-aabbccddeeff`
//! * pseudo-version after a release tag: `vX.Y.(Z+1)-0.YYYYmmddHHMMSS-aabbccddeeff`
//! * pseudo-version after a pre-release tag: `vX.Y.Z-RC1.0.YYYYmmddHHMMSS-aabbccddeeff`

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use snafu::Snafu;

/// Width of the `YYYYmmddHHMMSS` timestamp inside a pseudo-version.
const TIMESTAMP_LEN: usize = 14;

/// `chrono` layout of the pseudo-version timestamp.
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Prefix of the timestamp segment after a release tag.
const RELEASE_MARKER: &str = "0.";

/// Marker between a pre-release tag and the pseudo-version timestamp.
const PRE_RELEASE_MARKER: &str = ".0.";

/// Kind of a [`ModVersion`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Devel,
    Release,
    PreRelease,
    PseudoUntagged,
    PseudoBaseRelease,
    PseudoBasePreRelease,
    Error,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Devel => "Devel",
            Self::Release => "Release",
            Self::PreRelease => "PreRelease",
            Self::PseudoUntagged => "PseudoUntagged",
            Self::PseudoBaseRelease => "PseudoBaseRelease",
            Self::PseudoBasePreRelease => "PseudoBasePreRelease",
            Self::Error => "Error",
        }
    }

    /// True for the three pseudo-version kinds.
    pub fn is_pseudo(self) -> bool {
        matches!(
            self,
            Self::PseudoUntagged | Self::PseudoBaseRelease | Self::PseudoBasePreRelease
        )
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified version identifier.
///
/// Each variant carries only what can be recovered for it: commit id and time
/// exist only for pseudo-versions, the base tag only when a tag precedes the
/// commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModVersion {
    /// Built from a working copy, outside of the tag machinery.
    Devel,
    /// Built at a release tag.
    Release,
    /// Built at a pre-release tag.
    PreRelease,
    /// Built on a branch without any ancestor tag.
    PseudoUntagged {
        commit_id: String,
        time: DateTime<Utc>,
    },
    /// Built some commits after a release tag.
    PseudoBaseRelease {
        tag: String,
        commit_id: String,
        time: DateTime<Utc>,
    },
    /// Built some commits after a pre-release tag.
    PseudoBasePreRelease {
        tag: String,
        commit_id: String,
        time: DateTime<Utc>,
    },
    /// The identifier could not be understood.
    Error,
}

/// Why an identifier was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(display("malformed version identifier `{identifier}`: {reason}"))]
pub struct MalformedVersion {
    pub identifier: String,
    pub reason: &'static str,
}

impl ModVersion {
    /// Classifies `identifier`.
    ///
    /// The identifier is taken as is; an empty string is a `Release` with an
    /// empty tag. Callers that want the running binary's version substitute
    /// it before calling (see [`crate::report::Reporter::app_version`]).
    pub fn parse(identifier: &str) -> Result<Self, MalformedVersion> {
        let malformed = |reason| MalformedVersion {
            identifier: identifier.to_string(),
            reason,
        };

        let parts: Vec<&str> = identifier.split('-').collect();
        let tag = parts[0];
        let n = parts.len();

        // Not a pseudo-version
        if n < 3 {
            return Ok(if tag == "(devel)" {
                Self::Devel
            } else if tag.contains('-') {
                // Never true after the split; kept so PreRelease stays in the set.
                Self::PreRelease
            } else {
                Self::Release
            });
        }

        let commit_id = parts[n - 1];
        let stamp = parts[n - 2];
        if stamp.len() < TIMESTAMP_LEN {
            return Err(malformed("timestamp segment is too short"));
        }

        let (head, digits) = stamp
            .split_at_checked(stamp.len() - TIMESTAMP_LEN)
            .ok_or_else(|| malformed("timestamp is not a valid YYYYmmddHHMMSS value"))?;
        let time = parse_timestamp(digits)
            .ok_or_else(|| malformed("timestamp is not a valid YYYYmmddHHMMSS value"))?;
        let commit_id = commit_id.to_string();

        if head.is_empty() {
            return Ok(Self::PseudoUntagged { commit_id, time });
        }

        // "0." + timestamp: the patch number was bumped past the release tag
        if head.len() == 2 {
            if head != RELEASE_MARKER {
                return Err(malformed("release pseudo-version lacks the `0.` marker"));
            }
            let tag = previous_release(tag)
                .ok_or_else(|| malformed("base tag is not a MAJOR.MINOR.PATCH release"))?;
            return Ok(Self::PseudoBaseRelease {
                tag,
                commit_id,
                time,
            });
        }

        // "<pre>.0." + timestamp, with a non-empty pre-release identifier
        if head.len() <= PRE_RELEASE_MARKER.len() || !head.ends_with(PRE_RELEASE_MARKER) {
            return Err(malformed("pre-release pseudo-version lacks the `.0.` marker"));
        }

        let suffix_len = PRE_RELEASE_MARKER.len() + TIMESTAMP_LEN + 1 + commit_id.len();
        let tag = identifier
            .len()
            .checked_sub(suffix_len)
            .and_then(|end| identifier.get(..end))
            .ok_or_else(|| malformed("pre-release suffix does not fit the identifier"))?
            .to_string();

        Ok(Self::PseudoBasePreRelease {
            tag,
            commit_id,
            time,
        })
    }

    pub fn classification(&self) -> Classification {
        match self {
            Self::Devel => Classification::Devel,
            Self::Release => Classification::Release,
            Self::PreRelease => Classification::PreRelease,
            Self::PseudoUntagged { .. } => Classification::PseudoUntagged,
            Self::PseudoBaseRelease { .. } => Classification::PseudoBaseRelease,
            Self::PseudoBasePreRelease { .. } => Classification::PseudoBasePreRelease,
            Self::Error => Classification::Error,
        }
    }

    /// The tag the build is based on, for the two base-tag pseudo-versions.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::PseudoBaseRelease { tag, .. } | Self::PseudoBasePreRelease { tag, .. } => {
                Some(tag)
            }
            _ => None,
        }
    }

    pub fn commit_id(&self) -> Option<&str> {
        match self {
            Self::PseudoUntagged { commit_id, .. }
            | Self::PseudoBaseRelease { commit_id, .. }
            | Self::PseudoBasePreRelease { commit_id, .. } => Some(commit_id),
            _ => None,
        }
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::PseudoUntagged { time, .. }
            | Self::PseudoBaseRelease { time, .. }
            | Self::PseudoBasePreRelease { time, .. } => Some(*time),
            _ => None,
        }
    }
}

impl FromStr for ModVersion {
    type Err = MalformedVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parses exactly fourteen ASCII digits as a UTC timestamp.
fn parse_timestamp(digits: &str) -> Option<DateTime<Utc>> {
    if digits.len() != TIMESTAMP_LEN || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let naive = NaiveDateTime::parse_from_str(digits, TIMESTAMP_FORMAT).ok()?;
    Some(Utc.from_utc_datetime(&naive))
}

/// Undoes the speculative patch bump: `v1.2.4` becomes `v1.2.3`, `v1.2.0` stays.
fn previous_release(tag: &str) -> Option<String> {
    let parts: Vec<&str> = tag.split('.').collect();
    let [major, minor, patch] = parts[..] else {
        return None;
    };

    let patch: u64 = patch.parse().ok()?;
    Some(format!("{major}.{minor}.{}", patch.saturating_sub(1)))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_devel() {
        let v = ModVersion::parse("(devel)").unwrap();
        assert_eq!(v, ModVersion::Devel);
        assert!(v.tag().is_none());
        assert!(v.commit_id().is_none());
        assert!(v.time().is_none());
    }

    #[test]
    fn test_release() {
        assert_eq!(ModVersion::parse("v1.2.3").unwrap(), ModVersion::Release);
        assert_eq!(ModVersion::parse("").unwrap(), ModVersion::Release);
    }

    #[test]
    fn test_single_hyphen_suffix_is_release() {
        // The first segment never holds a hyphen, so two segments stay Release.
        for id in ["v1.2.3-RC1", "v1.2.3-", "-v1.2.3"] {
            let v = ModVersion::parse(id).unwrap();
            assert_eq!(v.classification(), Classification::Release, "{id}");
            assert!(v.tag().is_none());
        }
    }

    #[test]
    fn test_pseudo_base_release() {
        let v = ModVersion::parse("v1.2.4-0.20230105120000-abc123def456").unwrap();
        assert_eq!(
            v,
            ModVersion::PseudoBaseRelease {
                tag: "v1.2.3".to_string(),
                commit_id: "abc123def456".to_string(),
                time: at(2023, 1, 5, 12, 0, 0),
            }
        );
    }

    #[test]
    fn test_pseudo_base_release_patch_floor() {
        let v = ModVersion::parse("v1.2.0-0.20230105120000-abc123def456").unwrap();
        assert_eq!(v.tag(), Some("v1.2.0"));
    }

    #[test]
    fn test_pseudo_untagged() {
        let v = ModVersion::parse("v0.0.0-20230105120000-abc123def456").unwrap();
        assert_eq!(v.classification(), Classification::PseudoUntagged);
        assert_eq!(v.tag(), None);
        assert_eq!(v.commit_id(), Some("abc123def456"));
        assert_eq!(v.time(), Some(at(2023, 1, 5, 12, 0, 0)));
    }

    #[test]
    fn test_pseudo_base_pre_release() {
        let v = ModVersion::parse("v1.3.0-RC1.0.20230105120000-abc123def456").unwrap();
        assert_eq!(v.classification(), Classification::PseudoBasePreRelease);
        assert_eq!(v.tag(), Some("v1.3.0-RC1"));
        assert_eq!(v.commit_id(), Some("abc123def456"));
    }

    #[test]
    fn test_pseudo_base_pre_release_with_dotted_suffix() {
        let v = ModVersion::parse("v2.0.0-beta.2.0.20240229235959-0123456789ab").unwrap();
        assert_eq!(v.tag(), Some("v2.0.0-beta.2"));
        assert_eq!(v.time(), Some(at(2024, 2, 29, 23, 59, 59)));
    }

    #[test]
    fn test_malformed_short_segment() {
        let err = ModVersion::parse("garbage-short-id").unwrap_err();
        assert_eq!(err.identifier, "garbage-short-id");
        assert_eq!(err.reason, "timestamp segment is too short");
    }

    #[test]
    fn test_malformed_non_numeric_timestamp() {
        assert!(ModVersion::parse("v0.0.0-2023010512000x-abc").is_err());
        assert!(ModVersion::parse("v0.0.0-abcdefghijklmn-abc").is_err());
    }

    #[test]
    fn test_malformed_calendar_values() {
        assert!(ModVersion::parse("v0.0.0-20231305120000-abc").is_err());
        assert!(ModVersion::parse("v0.0.0-20230230120000-abc").is_err());
        assert!(ModVersion::parse("v0.0.0-20230105250000-abc").is_err());
    }

    #[test]
    fn test_malformed_release_base_tag() {
        assert!(ModVersion::parse("v1.2-0.20230105120000-abc").is_err());
        assert!(ModVersion::parse("v1.2.x-0.20230105120000-abc").is_err());
    }

    #[test]
    fn test_malformed_release_marker() {
        for id in [
            "v1.2.4-xx20230105120000-abc",
            "v1.2.4-0x20230105120000-abc",
            "v1.2.4-.020230105120000-abc",
        ] {
            let err = ModVersion::parse(id).unwrap_err();
            assert_eq!(err.reason, "release pseudo-version lacks the `0.` marker", "{id}");
        }
    }

    #[test]
    fn test_malformed_pre_release_marker() {
        for id in [
            "v1.2.3-x20230105120000-abc",
            "v1.3.0-RC1abc20230105120000-abc",
            "v1.3.0-RC1.1.20230105120000-abc",
            "v1.3.0-.0.20230105120000-abc",
        ] {
            let err = ModVersion::parse(id).unwrap_err();
            assert_eq!(err.reason, "pre-release pseudo-version lacks the `.0.` marker", "{id}");
        }
    }

    #[test]
    fn test_malformed_multibyte_timestamp_boundary() {
        assert!(ModVersion::parse("v1.2.3-é0230105120000-abc").is_err());
    }

    #[test]
    fn test_from_str_matches_parse() {
        let v: ModVersion = "v1.2.4-0.20230105120000-abc123def456".parse().unwrap();
        assert_eq!(v.classification(), Classification::PseudoBaseRelease);
    }

    #[test]
    fn test_classification_display() {
        assert_eq!(Classification::PseudoBasePreRelease.to_string(), "PseudoBasePreRelease");
        assert!(Classification::PseudoUntagged.is_pseudo());
        assert!(!Classification::Devel.is_pseudo());
        assert_eq!(ModVersion::Error.classification(), Classification::Error);
    }
}
