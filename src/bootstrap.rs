use crate::config::{APP_CONFIG_FILE_NAME, REGISTRY_FILE_NAME};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Empty registry document
const DEFAULT_MCP_SERVERS: &str = r#"{
  "mcpServers": {}
}
"#;

/// Example config.toml template
const EXAMPLE_CONFIG: &str = r#"# mcpsync configuration file

# Where the canonical server list comes from:
#   "self-managed"        edit it with `mcpsync server add/remove` (stored in mcpServers.json)
#   "imported-reference"  mirror the servers of another tool's config file, read-only
source-mode = "self-managed"

# Reference file for imported-reference mode
# reference-path = "~/.claude.json"

# Targets included in `mcpsync sync --all`. When omitted, every installed target is used.
# enabled-targets = ["claude-code", "gemini-cli", "codex"]

# Copy each target file to <file>.backup.<timestamp> before it is rewritten
backup = false

# Per-target config path overrides
# [targets.codex]
# path = "~/.codex/config.toml"
"#;

/// Create a file with content if it doesn't exist or force is true
fn create_file_if_needed(path: &Path, content: &str, force: bool, description: &str) -> Result<()> {
    if force || !path.exists() {
        fs::write(path, content)
            .with_context(|| format!("Failed to create {}: {}", description, path.display()))?;
        info!("Created {}", description);
    } else {
        info!("{} already exists, skipping", description);
    }
    Ok(())
}

/// Bootstrap the mcpsync configuration directory
///
/// # Errors
///
/// Returns an error if:
/// - Unable to create the configuration directory
/// - Unable to write either of the default files
pub fn bootstrap_config(config_dir: &Path, force: bool) -> Result<()> {
    fs::create_dir_all(config_dir)
        .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;

    create_file_if_needed(
        &config_dir.join(REGISTRY_FILE_NAME),
        DEFAULT_MCP_SERVERS,
        force,
        REGISTRY_FILE_NAME,
    )?;
    create_file_if_needed(
        &config_dir.join(APP_CONFIG_FILE_NAME),
        EXAMPLE_CONFIG,
        force,
        APP_CONFIG_FILE_NAME,
    )?;

    info!("Bootstrap complete at: {}", config_dir.display());
    Ok(())
}
