//! Work unit records: the coordination state for a single named resource.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of resource a work unit coordinates access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    File,
    Directory,
    Process,
}

impl Default for ResourceKind {
    fn default() -> Self {
        ResourceKind::File
    }
}

impl FromStr for ResourceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(ResourceKind::File),
            "directory" => Ok(ResourceKind::Directory),
            "process" => Ok(ResourceKind::Process),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::File => "file",
            ResourceKind::Directory => "directory",
            ResourceKind::Process => "process",
        };
        f.write_str(s)
    }
}

/// `available` (unowned) vs `claimed` (owned) — kept in lockstep with the
/// ownership fields by the registry, never set independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkUnitStatus {
    Available,
    Claimed,
}

/// One pending claimant. Position is not stored; it is always the claimant's
/// 1-based index in the owning work unit's `queue` vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub agent_id: String,
    pub requested_at: DateTime<Utc>,
}

/// A queue entry as seen by a reader, with its 1-based position filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntryView {
    pub agent_id: String,
    pub requested_at: DateTime<Utc>,
    pub position: usize,
}

/// The coordination record for one resource, keyed by `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkUnit {
    pub id: String,
    pub path: String,
    #[serde(rename = "type")]
    pub resource_kind: ResourceKind,
    pub owner_agent_id: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub queue: Vec<QueueEntryView>,
    pub status: WorkUnitStatus,
    pub ttl_seconds: u64,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of a `claim` call: either a grant or a queue admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimResult {
    pub success: bool,
    pub work_unit: WorkUnit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_agent_id: Option<String>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_kind_roundtrips_lowercase() {
        for (s, kind) in [
            ("file", ResourceKind::File),
            ("directory", ResourceKind::Directory),
            ("process", ResourceKind::Process),
        ] {
            assert_eq!(s.parse::<ResourceKind>().unwrap(), kind);
            assert_eq!(kind.to_string(), s);
        }
    }

    #[test]
    fn resource_kind_rejects_unknown() {
        assert!("socket".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn resource_kind_defaults_to_file() {
        assert_eq!(ResourceKind::default(), ResourceKind::File);
    }

    #[test]
    fn work_unit_serializes_type_field_name() {
        let wu = WorkUnit {
            id: "id-1".into(),
            path: "/x".into(),
            resource_kind: ResourceKind::File,
            owner_agent_id: None,
            claimed_at: None,
            queue: vec![],
            status: WorkUnitStatus::Available,
            ttl_seconds: 300,
            expires_at: None,
        };
        let v = serde_json::to_value(&wu).unwrap();
        assert_eq!(v["type"], "file");
        assert!(v.get("resource_kind").is_none());
    }
}
