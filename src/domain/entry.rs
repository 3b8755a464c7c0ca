//! Cached prerender entries and their freshness rules.

use time::{Duration, OffsetDateTime};

/// How long an unversioned entry keeps serving after its last write.
///
/// Entries written before version stamping existed carry an empty version
/// string; they stay valid for this window after their last update and go
/// stale afterwards. Versioned writes never use the grace window.
pub const LEGACY_GRACE_PERIOD: Duration = Duration::minutes(20);

/// A stored `(type, object_id) -> html` cache row with a version stamp.
///
/// Empty `html` means "not yet rendered"; empty `version` marks a legacy,
/// unversioned write.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryRecord {
    pub id: i64,
    pub kind: String,
    pub object_id: i64,
    pub html: String,
    pub version: String,
    pub created: OffsetDateTime,
    pub updated: OffsetDateTime,
}

impl EntryRecord {
    pub fn has_version(&self) -> bool {
        !self.version.is_empty()
    }

    /// Whether this entry may be served as-is.
    ///
    /// An entry is fresh when its HTML is present and its version matches the
    /// current HTML generation token. Unversioned entries fall back to the
    /// [`LEGACY_GRACE_PERIOD`] keyed off `updated`.
    pub fn is_fresh(&self, current: Option<&str>, now: OffsetDateTime) -> bool {
        if self.html.is_empty() {
            return false;
        }

        if self.has_version() {
            return current.is_some_and(|token| token == self.version);
        }

        now <= self.updated + LEGACY_GRACE_PERIOD
    }
}
