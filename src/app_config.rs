use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use toml_edit::{DocumentMut, Item, Table};

/// Application settings stored in `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct AppConfig {
    #[serde(default)]
    pub source_mode: SourceMode,
    /// Reference file read in imported-reference mode. Defaults to `~/.claude.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_path: Option<String>,
    /// Tool ids that take part in `sync --all`. Absent means every installed target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_targets: Option<Vec<String>>,
    /// Copy each target file to `<file>.backup.<timestamp>` before writing it.
    #[serde(default)]
    pub backup: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub targets: BTreeMap<String, TargetOverride>,
}

/// Where the canonical server list comes from.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SourceMode {
    /// Read-only list refreshed from an external reference file.
    ImportedReference,
    /// List maintained by mcpsync in its own registry document.
    #[default]
    SelfManaged,
}

impl std::fmt::Display for SourceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ImportedReference => write!(f, "imported-reference"),
            Self::SelfManaged => write!(f, "self-managed"),
        }
    }
}

/// Per-target settings under `[targets.<tool-id>]`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TargetOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl AppConfig {
    /// Load the application configuration from the default path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Unable to determine the config directory
    /// - Unable to read the config file (other than it not existing)
    /// - The config file contains invalid TOML
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path()?)
    }

    /// Load the application configuration from `config_path`; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config at {}", config_path.display()))?;

        Ok(config)
    }

    /// Save to `config_path`, creating parent directories.
    ///
    /// An existing file is edited in place, so its comments and layout survive.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization, parsing the existing file, or the write fails.
    pub fn save_to<P: AsRef<Path>>(&self, config_path: P) -> Result<()> {
        let config_path = config_path.as_ref();
        let fresh: DocumentMut = toml::to_string_pretty(self)
            .context("Failed to serialize config")?
            .parse()
            .context("Failed to serialize config")?;

        let content = match std::fs::read_to_string(config_path) {
            Ok(existing) => {
                let mut doc: DocumentMut = existing.parse().with_context(|| {
                    format!("Failed to parse TOML config at {}", config_path.display())
                })?;
                merge_table(doc.as_table_mut(), fresh.as_table());
                doc.to_string()
            },
            Err(e) if e.kind() == ErrorKind::NotFound => fresh.to_string(),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read config file at {}", config_path.display())
                })
            },
        };

        crate::config::writer::write_atomic(config_path, &content)
            .with_context(|| format!("Failed to write config file at {}", config_path.display()))
    }

    /// Get the path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if unable to determine the config directory
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
            Ok(PathBuf::from(config_home).join("mcpsync").join("config.toml"))
        } else if let Some(proj_dirs) = ProjectDirs::from("", "", "mcpsync") {
            Ok(proj_dirs.config_dir().join("config.toml"))
        } else {
            anyhow::bail!("Could not determine config directory")
        }
    }

    /// Reference file path with `~` expanded against `home`.
    pub fn resolved_reference_path(&self, home: &Path) -> PathBuf {
        self.reference_path.as_deref().map_or_else(
            || home.join(".claude.json"),
            |raw| crate::agent_paths::expand_home(raw, home),
        )
    }

    /// Path override configured for `tool_id`, with `~` expanded.
    pub fn target_path_override(&self, tool_id: &str, home: &Path) -> Option<PathBuf> {
        self.targets
            .get(tool_id)
            .and_then(|t| t.path.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| crate::agent_paths::expand_home(p, home))
    }

    /// Whether `tool_id` is enabled. Without an explicit list, installed targets are enabled.
    pub fn is_target_enabled(&self, tool_id: &str, installed: bool) -> bool {
        self.enabled_targets
            .as_ref()
            .map_or(installed, |ids| ids.iter().any(|id| id == tool_id))
    }

    /// Enable or disable `tool_id`.
    ///
    /// The first explicit change turns the implicit set (`currently_enabled`)
    /// into an explicit `enabled-targets` list.
    pub fn set_target_enabled(&mut self, tool_id: &str, enabled: bool, currently_enabled: &[String]) {
        let ids = self.enabled_targets.get_or_insert_with(|| currently_enabled.to_vec());
        if enabled {
            if !ids.iter().any(|id| id == tool_id) {
                ids.push(tool_id.to_string());
            }
        } else {
            ids.retain(|id| id != tool_id);
        }
    }
}

/// Bring `existing` in line with `fresh`. Surviving keys keep their comments.
fn merge_table(existing: &mut Table, fresh: &Table) {
    let stale: Vec<String> =
        existing.iter().map(|(key, _)| key.to_string()).filter(|key| !fresh.contains_key(key)).collect();
    for key in stale {
        existing.remove(&key);
    }

    for (key, item) in fresh.iter() {
        let Some(current) = existing.get_mut(key) else {
            existing.insert(key, item.clone());
            continue;
        };
        match (current, item) {
            (Item::Table(current), Item::Table(table)) => merge_table(current, table),
            (Item::Value(current), Item::Value(value)) => {
                let decor = current.decor().clone();
                *current = value.clone();
                *current.decor_mut() = decor;
            },
            (current, _) => *current = item.clone(),
        }
    }
}
