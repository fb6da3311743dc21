use crate::app_config::SourceMode;
use crate::merge::ConflictChoice;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "mcpsync",
    about = "Keep MCP server definitions in sync across AI coding tools",
    long_about = "mcpsync keeps one canonical list of MCP (Model Context Protocol) servers and
reconciles it into the configuration files of every installed AI coding tool.

Supported targets:
  • claude-code, claude-desktop, gemini-cli, amp, copilot-cli,
    opencode, factory-droid, qwen-code, codex

Configuration files are stored in:
  • $XDG_CONFIG_HOME/mcpsync/ (or ~/.config/mcpsync/)
    - mcpServers.json: canonical server list (self-managed mode)
    - config.toml: source mode, enabled targets, path overrides

Syncing never removes servers from a target. Servers only the target knows
about are kept as they are; servers with the same name but a different
definition are conflicts and are resolved in favour of the canonical list
unless told otherwise.",
    version,
    author
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug output (shows INFO and DEBUG messages)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Enable trace output (shows all log messages including TRACE)
    #[arg(short = 't', long, global = true)]
    pub trace: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bootstrap the mcpsync configuration directory with default files
    #[command(long_about = "Bootstrap the mcpsync configuration directory with default files.

This command creates the following structure in $XDG_CONFIG_HOME/mcpsync/:
  • mcpServers.json - empty canonical server list
  • config.toml - commented application settings

By default, existing files are preserved. Use --force to reinitialize.")]
    Init {
        /// Overwrite existing files with the defaults
        #[arg(short, long)]
        force: bool,
    },

    /// Inspect and select sync targets
    #[command(subcommand)]
    Targets(TargetsCommands),

    /// Inspect or switch where the canonical server list comes from
    #[command(subcommand)]
    Source(SourceCommands),

    /// Manage the canonical server list
    #[command(subcommand)]
    Server(ServerCommands),

    /// Show the sync status of every target
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what a sync of one target would change, without writing anything
    Preview(PreviewArgs),

    /// Write the canonical server list into target configuration files
    #[command(long_about = "Write the canonical server list into target configuration files.

For each target the current file is merged with the canonical list:
  • servers missing from the target are added
  • identical servers are left alone
  • servers defined differently are conflicts

Conflicts are always printed together with the resolution that will be used.

Examples:
  # Sync one target, resolving conflicts in favour of the canonical list
  mcpsync sync claude-code

  # Keep the target's own definitions for conflicting servers
  mcpsync sync gemini-cli --prefer target

  # Decide each conflict at a prompt
  mcpsync sync codex --interactive

  # Sync every enabled target
  mcpsync sync --all --backup")]
    Sync(SyncArgs),

    /// Check the canonical server list for problems
    Validate {
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum TargetsCommands {
    /// List supported targets with their config path and state
    List {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Include a target in `sync --all`
    Enable {
        /// Tool id, e.g. claude-code
        tool: String,
    },
    /// Exclude a target from `sync --all`
    Disable {
        /// Tool id, e.g. claude-code
        tool: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SourceCommands {
    /// Print the source mode and where the list is read from
    Show,
    /// Change the source mode
    SetMode {
        #[arg(value_enum)]
        mode: SourceMode,

        /// Reference file used in imported-reference mode
        #[arg(long, value_name = "PATH", value_hint = clap::ValueHint::FilePath)]
        reference_path: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ServerCommands {
    /// List servers in the canonical list
    List {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a server to the canonical list
    Add(ServerAddArgs),
    /// Remove a server from the canonical list
    Remove {
        name: String,
    },
    /// Import servers from another tool's configuration file
    Import {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,

        /// Replace the whole list instead of adding new names
        #[arg(long)]
        replace: bool,
    },
}

#[derive(Args, Debug)]
pub struct ServerAddArgs {
    pub name: String,

    /// Executable for a stdio server
    #[arg(long, required_unless_present = "url", conflicts_with = "url")]
    pub command: Option<String>,

    /// Argument passed to the command (repeatable)
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true, requires = "command")]
    pub args: Vec<String>,

    /// Environment variable as KEY=VALUE (repeatable)
    #[arg(long, value_name = "KEY=VALUE", value_parser = parse_key_value, requires = "command")]
    pub env: Vec<(String, String)>,

    /// Endpoint of a remote server
    #[arg(long)]
    pub url: Option<String>,

    /// HTTP header as KEY=VALUE (repeatable)
    #[arg(long, value_name = "KEY=VALUE", value_parser = parse_key_value, requires = "url")]
    pub header: Vec<(String, String)>,

    /// Add the server in disabled state
    #[arg(long)]
    pub disabled: bool,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Tool id, e.g. claude-code
    pub tool: String,

    /// Show the full file before and after instead of the merge summary
    #[arg(long)]
    pub content: bool,

    /// Side that wins every conflict
    #[arg(long, value_enum, default_value_t = ConflictChoice::Source)]
    pub prefer: ConflictChoice,

    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Tool id to sync
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub tool: Option<String>,

    /// Sync every enabled target
    #[arg(short = 'a', long)]
    pub all: bool,

    /// Side that wins every conflict
    #[arg(long, value_enum, default_value_t = ConflictChoice::Source, conflicts_with = "all")]
    pub prefer: ConflictChoice,

    /// Ask for each conflict
    #[arg(short, long, conflicts_with_all = ["all", "prefer"])]
    pub interactive: bool,

    /// Show what would be written without writing it
    #[arg(short, long)]
    pub dry_run: bool,

    /// Create timestamped backup of each target file before changing it
    #[arg(short, long)]
    pub backup: bool,
}

/// Parse `KEY=VALUE`; the value may itself contain `=`.
///
/// # Errors
///
/// Returns an error if there is no `=` or the key is empty.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}
