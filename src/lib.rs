#![allow(missing_docs)]

pub mod agent_paths;
pub mod app_config;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod import;
pub mod merge;
pub mod preview;
pub mod profiling;
pub mod registry;
pub mod status;
pub mod sync_operations;
pub mod targets;
pub mod validation;

use std::path::PathBuf;

pub use config::{Config, ServerDefinition, Transport};
pub use merge::{merge, ConflictChoice, ConflictResolutions, MergeResult, ServerConflict};
pub use registry::Registry;
pub use status::SyncStatus;
pub use sync_operations::{SyncEngine, SyncResult};
pub use targets::{Target, TargetError, TargetKind};

/// Failures loading or saving the canonical server list.
///
/// Any of these blocks every sync operation until resolved.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("the server list is read-only while the source mode is imported-reference")]
    ReadOnly,

    #[error("server `{0}` already exists")]
    Duplicate(String),

    #[error("server `{0}` not found")]
    NotFound(String),

    #[error("invalid server name: {0}")]
    InvalidName(String),

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

    #[error("could not determine home directory")]
    NoHome,

    #[error(transparent)]
    Reference(#[from] import::ImportError),
}
