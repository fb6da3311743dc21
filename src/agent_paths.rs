use crate::targets::TargetKind;
use std::path::{Path, PathBuf};

const CODEX_HOME_ENV: &str = "CODEX_HOME";

/// The current user's home directory.
#[must_use]
pub fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// Expand a leading `~` or `~/` against `home`.
#[must_use]
pub fn expand_home(raw: &str, home: &Path) -> PathBuf {
    if raw == "~" {
        home.to_path_buf()
    } else if let Some(rest) = raw.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(raw)
    }
}

/// Name of the environment variable that overrides the config path of `kind`,
/// e.g. `MCPSYNC_CLAUDE_CODE_CONFIG`.
#[must_use]
pub fn env_override_var(kind: TargetKind) -> String {
    format!("MCPSYNC_{}_CONFIG", kind.id().to_ascii_uppercase().replace('-', "_"))
}

/// Config path from the environment override, if set and non-empty.
#[must_use]
pub fn env_override_path(kind: TargetKind) -> Option<PathBuf> {
    std::env::var(env_override_var(kind))
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Platform config file candidates for `kind`, most preferred first.
#[must_use]
pub fn config_candidates(kind: TargetKind, home: &Path) -> Vec<PathBuf> {
    match kind {
        TargetKind::ClaudeCode => vec![home.join(".claude.json")],
        TargetKind::ClaudeDesktop => {
            vec![claude_desktop_dir(home).join("claude_desktop_config.json")]
        },
        TargetKind::GeminiCli => vec![home.join(".gemini").join("settings.json")],
        TargetKind::Amp => vec![home.join(".config").join("amp").join("settings.json")],
        TargetKind::CopilotCli => vec![home.join(".copilot").join("mcp-config.json")],
        TargetKind::OpenCode => vec![
            home.join(".config").join("opencode").join("opencode.json"),
            home.join(".config").join("opencode").join("config.json"),
        ],
        TargetKind::FactoryDroid => vec![home.join(".factory").join("mcp.json")],
        TargetKind::QwenCode => vec![home.join(".qwen").join("settings.json")],
        TargetKind::Codex => vec![codex_home(home).join("config.toml")],
    }
}

/// Directory whose presence means the tool is installed.
#[must_use]
pub fn install_marker(kind: TargetKind, home: &Path) -> PathBuf {
    match kind {
        TargetKind::ClaudeCode => home.join(".claude"),
        TargetKind::ClaudeDesktop => claude_desktop_dir(home),
        TargetKind::GeminiCli => home.join(".gemini"),
        TargetKind::Amp => home.join(".config").join("amp"),
        TargetKind::CopilotCli => home.join(".copilot"),
        TargetKind::OpenCode => home.join(".config").join("opencode"),
        TargetKind::FactoryDroid => home.join(".factory"),
        TargetKind::QwenCode => home.join(".qwen"),
        TargetKind::Codex => codex_home(home),
    }
}

fn codex_home(home: &Path) -> PathBuf {
    std::env::var(CODEX_HOME_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map_or_else(|| home.join(".codex"), PathBuf::from)
}

#[cfg(target_os = "macos")]
fn claude_desktop_dir(home: &Path) -> PathBuf {
    home.join("Library").join("Application Support").join("Claude")
}

#[cfg(windows)]
fn claude_desktop_dir(home: &Path) -> PathBuf {
    home.join("AppData").join("Roaming").join("Claude")
}

#[cfg(not(any(target_os = "macos", windows)))]
fn claude_desktop_dir(home: &Path) -> PathBuf {
    home.join(".config").join("Claude")
}
