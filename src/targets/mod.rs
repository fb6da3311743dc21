//! Target adapters: where each consumer tool keeps its MCP servers and how to
//! read and rewrite that collection without touching the rest of the file.

use crate::agent_paths;
use crate::app_config::AppConfig;
use crate::config::writer::{backup_file, write_atomic};
use crate::config::ServerDefinition;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

pub mod codex_toml;
pub mod json;

pub use json::JsonLayout;

/// Failures reading or writing one target. Always local to that target.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("{tool} is not installed")]
    NotInstalled { tool: String },

    #[error("unknown tool `{0}`")]
    UnknownTool(String),

    #[error("could not resolve the config path for {0}")]
    PathUnresolved(String),

    #[error("permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} changed on disk during sync", path.display())]
    ChangedOnDisk { path: PathBuf },
}

impl TargetError {
    fn read(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == ErrorKind::PermissionDenied {
            Self::PermissionDenied { path: path.to_path_buf() }
        } else {
            Self::Read { path: path.to_path_buf(), source }
        }
    }

    fn write(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == ErrorKind::PermissionDenied {
            Self::PermissionDenied { path: path.to_path_buf() }
        } else {
            Self::Write { path: path.to_path_buf(), source }
        }
    }
}

/// The closed set of supported consumer tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetKind {
    ClaudeCode,
    ClaudeDesktop,
    GeminiCli,
    Amp,
    CopilotCli,
    OpenCode,
    FactoryDroid,
    QwenCode,
    Codex,
}

/// On-disk format of a target's server collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Json(JsonLayout),
    CodexToml,
}

impl TargetKind {
    /// Every kind, in enumeration order.
    pub const ALL: [Self; 9] = [
        Self::ClaudeCode,
        Self::ClaudeDesktop,
        Self::GeminiCli,
        Self::Amp,
        Self::CopilotCli,
        Self::OpenCode,
        Self::FactoryDroid,
        Self::QwenCode,
        Self::Codex,
    ];

    pub const fn id(self) -> &'static str {
        match self {
            Self::ClaudeCode => "claude-code",
            Self::ClaudeDesktop => "claude-desktop",
            Self::GeminiCli => "gemini-cli",
            Self::Amp => "amp",
            Self::CopilotCli => "copilot-cli",
            Self::OpenCode => "opencode",
            Self::FactoryDroid => "factory-droid",
            Self::QwenCode => "qwen-code",
            Self::Codex => "codex",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::ClaudeCode => "Claude Code",
            Self::ClaudeDesktop => "Claude Desktop",
            Self::GeminiCli => "Gemini CLI",
            Self::Amp => "Amp",
            Self::CopilotCli => "Copilot CLI",
            Self::OpenCode => "OpenCode",
            Self::FactoryDroid => "Factory Droid",
            Self::QwenCode => "Qwen Code",
            Self::Codex => "Codex",
        }
    }

    pub const fn format(self) -> TargetFormat {
        match self {
            Self::ClaudeCode
            | Self::ClaudeDesktop
            | Self::GeminiCli
            | Self::FactoryDroid
            | Self::QwenCode => TargetFormat::Json(JsonLayout::Standard),
            Self::Amp => TargetFormat::Json(JsonLayout::Amp),
            Self::CopilotCli => TargetFormat::Json(JsonLayout::Copilot),
            Self::OpenCode => TargetFormat::Json(JsonLayout::OpenCode),
            Self::Codex => TargetFormat::CodexToml,
        }
    }

    /// Ids of every kind, for help and error messages.
    pub fn known_ids() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.id()).collect()
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for TargetKind {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| TargetError::UnknownTool(s.to_string()))
    }
}

/// Server collection decoded from a target file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedServers {
    pub servers: Vec<ServerDefinition>,
    /// Whether the file contains the server collection at all.
    pub has_section: bool,
}

/// A target's current state as read from disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetSnapshot {
    pub servers: Vec<ServerDefinition>,
    /// Full file text, `None` when the file does not exist.
    pub raw_text: Option<String>,
    pub has_section: bool,
}

impl TargetSnapshot {
    pub fn exists(&self) -> bool {
        self.raw_text.is_some()
    }

    /// File text, or the empty string when the file does not exist.
    pub fn current_content(&self) -> &str {
        self.raw_text.as_deref().unwrap_or_default()
    }
}

/// Summary row for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetDescriptor {
    pub tool_id: String,
    pub display_name: String,
    pub config_path: PathBuf,
    pub installed: bool,
    pub enabled: bool,
}

/// A located target: one tool and the file it reads its servers from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    kind: TargetKind,
    config_path: PathBuf,
    install_marker: PathBuf,
    enabled: bool,
}

impl Target {
    /// A target at an explicit path. It counts as installed when the file or its
    /// parent directory exists.
    pub fn new<P: Into<PathBuf>>(kind: TargetKind, config_path: P) -> Self {
        let config_path = config_path.into();
        let install_marker = parent_dir(&config_path);
        Self { kind, config_path, install_marker, enabled: true }
    }

    /// Resolve where `kind` keeps its config.
    ///
    /// Precedence: `[targets.<id>] path` in `config.toml`, then the
    /// `MCPSYNC_<TOOL>_CONFIG` environment variable, then the first existing
    /// platform candidate, then the first candidate.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::PathUnresolved`] when no override is set and the
    /// home directory is unknown.
    pub fn locate(
        kind: TargetKind,
        home: Option<&Path>,
        app_config: &AppConfig,
    ) -> Result<Self, TargetError> {
        let overridden = home
            .and_then(|h| app_config.target_path_override(kind.id(), h))
            .or_else(|| agent_paths::env_override_path(kind));

        let mut target = if let Some(path) = overridden {
            debug!("Using overridden config path for {}: {}", kind, path.display());
            Self::new(kind, path)
        } else {
            let home = home.ok_or_else(|| TargetError::PathUnresolved(kind.id().to_string()))?;
            let candidates = agent_paths::config_candidates(kind, home);
            let config_path = candidates
                .iter()
                .find(|p| p.exists())
                .or_else(|| candidates.first())
                .cloned()
                .ok_or_else(|| TargetError::PathUnresolved(kind.id().to_string()))?;
            Self {
                kind,
                config_path,
                install_marker: agent_paths::install_marker(kind, home),
                enabled: true,
            }
        };

        target.enabled = app_config.is_target_enabled(kind.id(), target.is_installed());
        Ok(target)
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_install_marker<P: Into<PathBuf>>(mut self, marker: P) -> Self {
        self.install_marker = marker.into();
        self
    }

    pub const fn kind(&self) -> TargetKind {
        self.kind
    }

    pub const fn tool_id(&self) -> &'static str {
        self.kind.id()
    }

    pub const fn display_name(&self) -> &'static str {
        self.kind.display_name()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_installed(&self) -> bool {
        self.config_path.exists() || self.install_marker.is_dir()
    }

    pub fn descriptor(&self) -> TargetDescriptor {
        TargetDescriptor {
            tool_id: self.tool_id().to_string(),
            display_name: self.display_name().to_string(),
            config_path: self.config_path.clone(),
            installed: self.is_installed(),
            enabled: self.enabled,
        }
    }

    /// Read the current server collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn read(&self) -> Result<TargetSnapshot, TargetError> {
        let text = match fs::read_to_string(&self.config_path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} has no config file at {}", self.kind, self.config_path.display());
                return Ok(TargetSnapshot::default());
            },
            Err(e) => return Err(TargetError::read(&self.config_path, e)),
        };

        let parsed = self.parse(&text)?;
        Ok(TargetSnapshot {
            servers: parsed.servers,
            raw_text: Some(text),
            has_section: parsed.has_section,
        })
    }

    /// Decode the server collection from file text.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::Parse`] for malformed text or a malformed collection.
    pub fn parse(&self, text: &str) -> Result<ParsedServers, TargetError> {
        let parsed = match self.kind.format() {
            TargetFormat::Json(layout) => json::parse(layout, text),
            TargetFormat::CodexToml => codex_toml::parse(text),
        };
        parsed.map_err(|message| TargetError::Parse { path: self.config_path.clone(), message })
    }

    /// Produce the full file text holding `final_servers`.
    ///
    /// `current` is the file text (or `None` for a missing file). Entries whose
    /// definition is equivalent to the existing one keep their existing text;
    /// entries not named in `final_servers` are left alone; new names are appended.
    /// When nothing changes the current text is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::Parse`] if `current` cannot be parsed.
    pub fn render(
        &self,
        current: Option<&str>,
        final_servers: &[ServerDefinition],
    ) -> Result<String, TargetError> {
        let rendered = match self.kind.format() {
            TargetFormat::Json(layout) => json::render(layout, current, final_servers),
            TargetFormat::CodexToml => codex_toml::render(current, final_servers),
        };
        rendered.map_err(|message| TargetError::Parse { path: self.config_path.clone(), message })
    }

    /// Persist `content`, provided the file still holds `expected`.
    ///
    /// Returns the backup path when `backup` is set and the file existed.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::ChangedOnDisk`] if the file no longer matches
    /// `expected`, and read/write/permission errors otherwise.
    pub fn write(
        &self,
        expected: Option<&str>,
        content: &str,
        backup: bool,
    ) -> Result<Option<PathBuf>, TargetError> {
        let on_disk = match fs::read_to_string(&self.config_path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(TargetError::read(&self.config_path, e)),
        };
        if on_disk.as_deref() != expected {
            return Err(TargetError::ChangedOnDisk { path: self.config_path.clone() });
        }

        let backup_path = if backup {
            backup_file(&self.config_path).map_err(|e| TargetError::write(&self.config_path, e))?
        } else {
            None
        };
        if let Some(path) = &backup_path {
            debug!("Backed up {} to {}", self.config_path.display(), path.display());
        }

        write_atomic(&self.config_path, content)
            .map_err(|e| TargetError::write(&self.config_path, e))?;
        debug!("Wrote {} bytes to {}", content.len(), self.config_path.display());

        Ok(backup_path)
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Trailing newline policy shared by the serializers: keep the original's, and
/// end new files with one.
pub(crate) fn wants_trailing_newline(current: Option<&str>) -> bool {
    current.filter(|text| !text.trim().is_empty()).map_or(true, |text| text.ends_with('\n'))
}
