#![allow(missing_docs)]

use crate::agent_paths;
use crate::app_config::AppConfig;
use crate::merge::ConflictResolutions;
use crate::preview::{self, ConfigPreview, SyncPlan, SyncPreview};
use crate::profiling::{SyncMetrics, Timer};
use crate::registry::Registry;
use crate::status::{self, SyncStatus};
use crate::targets::{Target, TargetDescriptor, TargetError, TargetKind};
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of one apply attempt. Independent per target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub tool_id: String,
    pub success: bool,
    pub message: String,
    pub servers_written: usize,
}

impl SyncResult {
    fn success(tool_id: &str, message: String, servers_written: usize) -> Self {
        Self { tool_id: tool_id.to_string(), success: true, message, servers_written }
    }

    fn failure(tool_id: &str, error: &TargetError) -> Self {
        Self { tool_id: tool_id.to_string(), success: false, message: error.to_string(), servers_written: 0 }
    }
}

/// Drives status, preview and apply for a set of targets against one registry.
#[derive(Debug)]
pub struct SyncEngine<'r> {
    registry: &'r Registry,
    targets: Vec<Target>,
    backup: bool,
}

impl<'r> SyncEngine<'r> {
    pub fn new(registry: &'r Registry, targets: Vec<Target>) -> Self {
        Self { registry, targets, backup: false }
    }

    /// Locate every supported target using `app_config` and the user's home.
    ///
    /// Targets whose path cannot be resolved are left out with a warning.
    pub fn from_app_config(registry: &'r Registry, app_config: &AppConfig) -> Self {
        let home = agent_paths::home_dir();
        let targets = TargetKind::ALL
            .into_iter()
            .filter_map(|kind| match Target::locate(kind, home.as_deref(), app_config) {
                Ok(target) => Some(target),
                Err(e) => {
                    warn!("Skipping {}: {}", kind, e);
                    None
                },
            })
            .collect();
        Self::new(registry, targets).with_backup(app_config.backup)
    }

    #[must_use]
    pub const fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    pub const fn registry(&self) -> &Registry {
        self.registry
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Look up a target by tool id.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::UnknownTool`] if no target has that id.
    pub fn target(&self, tool_id: &str) -> Result<&Target, TargetError> {
        self.targets
            .iter()
            .find(|t| t.tool_id() == tool_id)
            .ok_or_else(|| TargetError::UnknownTool(tool_id.to_string()))
    }

    pub fn list_targets(&self) -> Vec<TargetDescriptor> {
        self.targets.iter().map(Target::descriptor).collect()
    }

    /// Status of one target.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::UnknownTool`] for an unknown id. Read failures are
    /// reported as [`SyncStatus::Unreadable`].
    pub fn get_status(&self, tool_id: &str) -> Result<SyncStatus, TargetError> {
        let target = self.target(tool_id)?;
        Ok(status::classify(target, self.registry.servers()))
    }

    /// Status of every target, in enumeration order.
    pub fn statuses(&self) -> Vec<(TargetDescriptor, SyncStatus)> {
        crate::time_block!("statuses", {
            self.targets
                .par_iter()
                .map(|t| (t.descriptor(), status::classify(t, self.registry.servers())))
                .collect()
        })
    }

    /// # Errors
    ///
    /// Returns an error for an unknown id or an unreadable target file.
    pub fn preview(&self, tool_id: &str) -> Result<SyncPreview, TargetError> {
        preview::preview(self.target(tool_id)?, self.registry.servers())
    }

    /// Previews for every enabled, installed target.
    pub fn preview_all(&self) -> Vec<Result<SyncPreview, TargetError>> {
        self.targets
            .iter()
            .filter(|t| t.is_enabled() && t.is_installed())
            .map(|t| preview::preview(t, self.registry.servers()))
            .collect()
    }

    /// # Errors
    ///
    /// Returns an error for an unknown id or an unreadable target file.
    pub fn preview_content(
        &self,
        tool_id: &str,
        overrides: Option<&ConflictResolutions>,
    ) -> Result<ConfigPreview, TargetError> {
        preview::preview_content(self.target(tool_id)?, self.registry.servers(), overrides)
    }

    /// Apply the source list to one target.
    ///
    /// The merge is recomputed from the file as it is now. Failures are
    /// reported in the result, never returned.
    pub fn apply_one(&self, tool_id: &str, overrides: Option<&ConflictResolutions>) -> SyncResult {
        match self.target(tool_id) {
            Ok(target) => self.apply_target(target, overrides),
            Err(e) => SyncResult::failure(tool_id, &e),
        }
    }

    /// Apply to every enabled target in parallel, default resolution for conflicts.
    ///
    /// Results follow target enumeration order. Enabled targets that are not
    /// installed are reported as failures.
    pub fn apply_all(&self) -> Vec<SyncResult> {
        let timer = Timer::new("apply_all");
        let enabled: Vec<&Target> = self.targets.iter().filter(|t| t.is_enabled()).collect();
        info!("Syncing {} enabled targets", enabled.len());

        let outcomes: Vec<_> = enabled
            .par_iter()
            .map(|target| {
                let start = Instant::now();
                let result = self.apply_target(target, None);
                (result, start.elapsed())
            })
            .collect();

        let mut metrics = SyncMetrics::new();
        let results: Vec<SyncResult> = outcomes
            .into_iter()
            .map(|(result, elapsed)| {
                metrics.record(&result.tool_id, elapsed, result.success);
                result
            })
            .collect();
        metrics.total_duration = timer.stop();
        metrics.log_summary();

        results
    }

    fn apply_target(&self, target: &Target, overrides: Option<&ConflictResolutions>) -> SyncResult {
        match self.try_apply(target, overrides) {
            Ok(result) => {
                info!("{}: {}", target.tool_id(), result.message);
                result
            },
            Err(e) => {
                warn!("{}: sync failed: {}", target.tool_id(), e);
                SyncResult::failure(target.tool_id(), &e)
            },
        }
    }

    fn try_apply(
        &self,
        target: &Target,
        overrides: Option<&ConflictResolutions>,
    ) -> Result<SyncResult, TargetError> {
        if !target.is_installed() {
            return Err(TargetError::NotInstalled { tool: target.display_name().to_string() });
        }

        let snapshot = target.read()?;
        let plan = SyncPlan::build(target, &snapshot, self.registry.servers(), overrides)?;
        let written = plan.final_servers.len();

        if snapshot.current_content() == plan.rendered {
            debug!("{} is already up to date", target.config_path().display());
            return Ok(SyncResult::success(
                target.tool_id(),
                format!("Already in sync ({written} servers)"),
                written,
            ));
        }

        let backup = target.write(snapshot.raw_text.as_deref(), &plan.rendered, self.backup)?;

        let merge = &plan.merge_result;
        let mut message = format!(
            "Synced {} servers ({} added, {} kept, {} conflicts resolved)",
            written,
            merge.added.len(),
            merge.kept.len(),
            merge.conflicts.len()
        );
        if let Some(path) = backup {
            message.push_str(&format!("; backup at {}", path.display()));
        }
        Ok(SyncResult::success(target.tool_id(), message, written))
    }
}
