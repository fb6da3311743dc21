//! Side-effect free previews of what a sync would do.

use crate::config::ServerDefinition;
use crate::merge::{final_servers, merge, ConflictResolutions, MergeResult};
use crate::targets::{Target, TargetError, TargetSnapshot};
use serde::Serialize;
use std::path::PathBuf;

/// Structured view of a pending sync.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncPreview {
    pub tool_id: String,
    pub tool_name: String,
    pub merge_result: MergeResult,
    pub has_changes: bool,
}

/// The file text before and after a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigPreview {
    pub tool_id: String,
    pub tool_name: String,
    pub config_path: PathBuf,
    /// Empty when the file does not exist yet.
    pub current_content: String,
    pub preview_content: String,
}

impl ConfigPreview {
    pub fn is_unchanged(&self) -> bool {
        self.current_content == self.preview_content
    }
}

/// Everything an apply needs, computed from one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPlan {
    pub merge_result: MergeResult,
    pub final_servers: Vec<ServerDefinition>,
    pub rendered: String,
}

impl SyncPlan {
    /// Merge, resolve and render against `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot text cannot be re-parsed for rendering.
    pub fn build(
        target: &Target,
        snapshot: &TargetSnapshot,
        source: &[ServerDefinition],
        overrides: Option<&ConflictResolutions>,
    ) -> Result<Self, TargetError> {
        let merge_result = merge(target.tool_id(), source, &snapshot.servers);
        let final_servers = final_servers(&merge_result, &snapshot.servers, overrides);
        let rendered = target.render(snapshot.raw_text.as_deref(), &final_servers)?;
        Ok(Self { merge_result, final_servers, rendered })
    }
}

/// Merge `source` against the target's current servers.
///
/// # Errors
///
/// Returns an error if the target file cannot be read or parsed.
pub fn preview(target: &Target, source: &[ServerDefinition]) -> Result<SyncPreview, TargetError> {
    let snapshot = target.read()?;
    let merge_result = merge(target.tool_id(), source, &snapshot.servers);
    Ok(SyncPreview {
        tool_id: target.tool_id().to_string(),
        tool_name: target.display_name().to_string(),
        has_changes: merge_result.has_changes(),
        merge_result,
    })
}

/// The exact text an apply with `overrides` would write.
///
/// # Errors
///
/// Returns an error if the target file cannot be read or parsed.
pub fn preview_content(
    target: &Target,
    source: &[ServerDefinition],
    overrides: Option<&ConflictResolutions>,
) -> Result<ConfigPreview, TargetError> {
    let snapshot = target.read()?;
    let plan = SyncPlan::build(target, &snapshot, source, overrides)?;
    Ok(ConfigPreview {
        tool_id: target.tool_id().to_string(),
        tool_name: target.display_name().to_string(),
        config_path: target.config_path().to_path_buf(),
        current_content: snapshot.current_content().to_string(),
        preview_content: plan.rendered,
    })
}
