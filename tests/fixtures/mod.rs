#![allow(dead_code)]

use mcpsync::config::ServerDefinition;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// Test fixture with a fake home directory and an mcpsync config directory
pub struct TestFixture {
    /// Temporary directory that will be cleaned up on drop
    pub temp: TempDir,
    /// Path to the config directory (`XDG_CONFIG_HOME/mcpsync`)
    pub config: PathBuf,
    /// Path used as `$HOME`
    pub home: PathBuf,
}

impl TestFixture {
    /// Create a new test fixture with temporary directories
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempdir()?;
        let config_dir = temp_dir.path().join("config").join("mcpsync");
        let home_dir = temp_dir.path().join("home");

        fs::create_dir_all(&config_dir)?;
        fs::create_dir_all(&home_dir)?;

        Ok(Self { temp: temp_dir, config: config_dir, home: home_dir })
    }

    /// Get the config home directory (parent of the mcpsync config)
    pub fn config_home(&self) -> PathBuf {
        self.temp.path().join("config")
    }

    /// Write the registry document
    pub fn with_registry(&self, content: &str) -> std::io::Result<&Self> {
        fs::write(self.registry_path(), content)?;
        Ok(self)
    }

    /// Write config.toml
    pub fn with_app_config(&self, content: &str) -> std::io::Result<&Self> {
        fs::write(self.config.join("config.toml"), content)?;
        Ok(self)
    }

    /// Write a file relative to the fake home, creating parent directories
    pub fn with_home_file(&self, relative: &str, content: &str) -> std::io::Result<PathBuf> {
        let path = self.home.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Create a directory relative to the fake home
    pub fn with_home_dir(&self, relative: &str) -> std::io::Result<PathBuf> {
        let path = self.home.join(relative);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.config.join("mcpServers.json")
    }

    pub fn read_home_file(&self, relative: &str) -> std::io::Result<String> {
        fs::read_to_string(self.home.join(relative))
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }
}

/// Stdio server with no arguments
pub fn stdio(name: &str, command: &str) -> ServerDefinition {
    ServerDefinition::stdio(name, command, Vec::<String>::new())
}

/// Standard `mcpServers` document with the given entries
pub fn standard_document(entries: &str) -> String {
    format!("{{\n  \"mcpServers\": {{{entries}}}\n}}\n")
}
