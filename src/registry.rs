//! The canonical server list handed to every merge.

use crate::agent_paths;
use crate::app_config::{AppConfig, SourceMode};
use crate::config::reader::read_registry_document;
use crate::config::writer::write_registry_document;
use crate::config::{Config, ServerDefinition};
use crate::import::{self, ImportError};
use crate::RegistryError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Handle on the source list.
///
/// In self-managed mode every mutation is written to the registry document
/// before it becomes visible. In imported-reference mode the list mirrors the
/// reference file and cannot be edited.
#[derive(Debug, Clone)]
pub struct Registry {
    mode: SourceMode,
    path: Option<PathBuf>,
    servers: Vec<ServerDefinition>,
}

/// Names affected by [`Registry::import_servers`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub added: Vec<String>,
    pub skipped: Vec<String>,
}

impl Registry {
    /// Load the registry for the configured source mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry document or reference file cannot be
    /// read or parsed, or the reference path needs a home directory that is unknown.
    pub fn load(config: &Config, app_config: &AppConfig) -> Result<Self, RegistryError> {
        match app_config.source_mode {
            SourceMode::SelfManaged => Self::open_document(&config.registry_path),
            SourceMode::ImportedReference => {
                let path = match agent_paths::home_dir() {
                    Some(home) => app_config.resolved_reference_path(&home),
                    None => app_config
                        .reference_path
                        .as_deref()
                        .filter(|p| !p.starts_with('~'))
                        .map(PathBuf::from)
                        .ok_or(RegistryError::NoHome)?,
                };
                Self::open_reference(path)
            },
        }
    }

    /// Open a self-managed registry backed by the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document exists but cannot be read or parsed.
    pub fn open_document<P: Into<PathBuf>>(path: P) -> Result<Self, RegistryError> {
        let path = path.into();
        let servers = read_registry_document(&path)?;
        debug!("Loaded {} servers from {}", servers.len(), path.display());
        Ok(Self { mode: SourceMode::SelfManaged, path: Some(path), servers })
    }

    /// Open a read-only registry mirroring the reference file at `path`.
    ///
    /// A reference without any server section yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or malformed.
    pub fn open_reference<P: Into<PathBuf>>(path: P) -> Result<Self, RegistryError> {
        let path = path.into();
        let servers = read_reference(&path)?;
        Ok(Self { mode: SourceMode::ImportedReference, path: Some(path), servers })
    }

    /// A self-managed registry that is never persisted.
    pub fn in_memory(servers: Vec<ServerDefinition>) -> Self {
        Self { mode: SourceMode::SelfManaged, path: None, servers }
    }

    pub const fn mode(&self) -> SourceMode {
        self.mode
    }

    /// Registry document or reference file backing this registry.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_read_only(&self) -> bool {
        self.mode == SourceMode::ImportedReference
    }

    /// The source list, in registry order.
    pub fn servers(&self) -> &[ServerDefinition] {
        &self.servers
    }

    pub fn get(&self, name: &str) -> Option<&ServerDefinition> {
        self.servers.iter().find(|s| s.name == name)
    }

    /// Add a new server.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ReadOnly`], [`RegistryError::InvalidName`],
    /// [`RegistryError::Duplicate`] or a write error.
    pub fn add_server(&mut self, server: ServerDefinition) -> Result<(), RegistryError> {
        self.ensure_writable()?;
        validate_name(&server.name)?;
        if self.get(&server.name).is_some() {
            return Err(RegistryError::Duplicate(server.name));
        }

        let mut servers = self.servers.clone();
        info!("Adding server `{}`", server.name);
        servers.push(server);
        self.commit(servers)
    }

    /// Replace the server named `original_name`, renaming it if `server.name` differs.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if `original_name` does not exist and
    /// [`RegistryError::Duplicate`] if the new name is already taken.
    pub fn update_server(
        &mut self,
        original_name: &str,
        server: ServerDefinition,
    ) -> Result<(), RegistryError> {
        self.ensure_writable()?;
        validate_name(&server.name)?;
        let index = self
            .position(original_name)
            .ok_or_else(|| RegistryError::NotFound(original_name.to_string()))?;
        if server.name != original_name && self.get(&server.name).is_some() {
            return Err(RegistryError::Duplicate(server.name));
        }

        let mut servers = self.servers.clone();
        servers[index] = server;
        self.commit(servers)
    }

    /// Remove and return the server named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if no server has that name.
    pub fn remove_server(&mut self, name: &str) -> Result<ServerDefinition, RegistryError> {
        self.ensure_writable()?;
        let index = self.position(name).ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        let mut servers = self.servers.clone();
        let removed = servers.remove(index);
        self.commit(servers)?;
        info!("Removed server `{name}`");
        Ok(removed)
    }

    /// Replace the whole list.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is invalid or repeated, or the write fails.
    pub fn replace_all(&mut self, servers: Vec<ServerDefinition>) -> Result<(), RegistryError> {
        self.ensure_writable()?;
        let mut seen = HashSet::with_capacity(servers.len());
        for server in &servers {
            validate_name(&server.name)?;
            if !seen.insert(server.name.as_str()) {
                return Err(RegistryError::Duplicate(server.name.clone()));
            }
        }
        self.commit(servers)
    }

    /// Add servers whose names are new; with `replace`, swap in the whole list.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry is read-only or the write fails.
    pub fn import_servers(
        &mut self,
        imported: Vec<ServerDefinition>,
        replace: bool,
    ) -> Result<ImportSummary, RegistryError> {
        self.ensure_writable()?;
        let mut summary = ImportSummary::default();

        if replace {
            summary.added = imported.iter().map(|s| s.name.clone()).collect();
            self.replace_all(imported)?;
            return Ok(summary);
        }

        let mut servers = self.servers.clone();
        for server in imported {
            if servers.iter().any(|s| s.name == server.name) {
                summary.skipped.push(server.name);
            } else {
                validate_name(&server.name)?;
                summary.added.push(server.name.clone());
                servers.push(server);
            }
        }
        self.commit(servers)?;
        Ok(summary)
    }

    /// Rewrite the registry document from memory.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ReadOnly`] in imported-reference mode, or a write error.
    pub fn flush(&self) -> Result<(), RegistryError> {
        self.ensure_writable()?;
        self.persist(&self.servers)
    }

    /// Reload from the backing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file cannot be read or parsed.
    pub fn refresh(&mut self) -> Result<(), RegistryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        self.servers = match self.mode {
            SourceMode::SelfManaged => read_registry_document(path)?,
            SourceMode::ImportedReference => read_reference(path)?,
        };
        Ok(())
    }

    fn ensure_writable(&self) -> Result<(), RegistryError> {
        if self.is_read_only() {
            Err(RegistryError::ReadOnly)
        } else {
            Ok(())
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.servers.iter().position(|s| s.name == name)
    }

    fn commit(&mut self, servers: Vec<ServerDefinition>) -> Result<(), RegistryError> {
        self.persist(&servers)?;
        self.servers = servers;
        Ok(())
    }

    fn persist(&self, servers: &[ServerDefinition]) -> Result<(), RegistryError> {
        match &self.path {
            Some(path) => write_registry_document(path, servers),
            None => Ok(()),
        }
    }
}

fn read_reference(path: &Path) -> Result<Vec<ServerDefinition>, RegistryError> {
    match import::parse_config_file(path) {
        Ok(result) => Ok(result.servers),
        Err(ImportError::UnrecognizedFormat { .. }) => {
            warn!("No MCP servers found in reference file {}", path.display());
            Ok(Vec::new())
        },
        Err(e) => Err(e.into()),
    }
}

fn validate_name(name: &str) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::InvalidName("name must not be empty".to_string()));
    }
    if name.trim() != name || name.chars().any(char::is_control) {
        return Err(RegistryError::InvalidName(format!(
            "`{name}` has surrounding whitespace or control characters"
        )));
    }
    Ok(())
}
