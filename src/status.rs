use crate::config::ServerDefinition;
use crate::merge::merge;
use crate::targets::{Target, TargetSnapshot};
use serde::Serialize;

/// Where a target stands relative to the source list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "kebab-case")]
pub enum SyncStatus {
    Synced,
    OutOfSync,
    Conflicted,
    NotInstalled,
    NoExistingSection,
    /// The file exists but could not be read or parsed.
    Unreadable(String),
}

impl SyncStatus {
    /// Whether offering a sync makes sense.
    pub const fn can_sync(&self) -> bool {
        !matches!(self, Self::Synced | Self::NotInstalled | Self::Unreadable(_))
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::OutOfSync => "out of sync",
            Self::Conflicted => "conflicts",
            Self::NotInstalled => "not installed",
            Self::NoExistingSection => "no servers section",
            Self::Unreadable(_) => "unreadable",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreadable(message) => write!(f, "unreadable ({message})"),
            other => f.write_str(other.label()),
        }
    }
}

/// Classify `target` against `source` by reading its current file.
pub fn classify(target: &Target, source: &[ServerDefinition]) -> SyncStatus {
    if !target.is_installed() {
        return SyncStatus::NotInstalled;
    }
    match target.read() {
        Ok(snapshot) => classify_snapshot(target.tool_id(), &snapshot, source),
        Err(e) => SyncStatus::Unreadable(e.to_string()),
    }
}

/// Classify an already-read snapshot.
pub fn classify_snapshot(
    tool_id: &str,
    snapshot: &TargetSnapshot,
    source: &[ServerDefinition],
) -> SyncStatus {
    if !snapshot.has_section {
        return SyncStatus::NoExistingSection;
    }

    let result = merge(tool_id, source, &snapshot.servers);
    if !result.conflicts.is_empty() {
        SyncStatus::Conflicted
    } else if !result.added.is_empty() {
        SyncStatus::OutOfSync
    } else {
        SyncStatus::Synced
    }
}
