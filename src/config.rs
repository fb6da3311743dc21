#![allow(clippy::self_named_module_files)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub mod reader;
pub mod writer;

/// File name of the registry document inside the config directory.
pub const REGISTRY_FILE_NAME: &str = "mcpServers.json";

/// File name of the application settings inside the config directory.
pub const APP_CONFIG_FILE_NAME: &str = "config.toml";

/// Keys of a standard `mcpServers` entry that map onto [`ServerDefinition`] fields.
const KNOWN_STANDARD_FIELDS: &[&str] = &["command", "args", "env", "url", "headers", "disabled"];

/// How a server is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Transport {
    /// A local process started with `command` and `args`.
    Stdio {
        command: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        env: BTreeMap<String, String>,
    },
    /// A remote endpoint.
    Remote {
        url: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, String>,
    },
}

/// One named MCP server entry.
///
/// `name` is the identity key within a list. `extra` carries keys that have no
/// dedicated field; they are written back only by the standard JSON layout and
/// do not take part in [`ServerDefinition::is_equivalent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerDefinition {
    pub name: String,
    #[serde(flatten)]
    pub transport: Transport,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl ServerDefinition {
    /// Creates a stdio server definition.
    pub fn stdio<N, C, I, A>(name: N, command: C, args: I) -> Self
    where
        N: Into<String>,
        C: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            name: name.into(),
            transport: Transport::Stdio {
                command: command.into(),
                args: args.into_iter().map(Into::into).collect(),
                env: BTreeMap::new(),
            },
            disabled: false,
            extra: Map::new(),
        }
    }

    /// Creates a remote server definition.
    pub fn remote<N: Into<String>, U: Into<String>>(name: N, url: U) -> Self {
        Self {
            name: name.into(),
            transport: Transport::Remote { url: url.into(), headers: BTreeMap::new() },
            disabled: false,
            extra: Map::new(),
        }
    }

    /// Adds an environment variable (stdio) or a header (remote).
    #[must_use]
    pub fn with_env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        match &mut self.transport {
            Transport::Stdio { env, .. } => {
                env.insert(key.into(), value.into());
            },
            Transport::Remote { headers, .. } => {
                headers.insert(key.into(), value.into());
            },
        }
        self
    }

    #[must_use]
    pub const fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    #[must_use]
    pub fn with_name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// Structural equality used by the merge engine.
    ///
    /// Args are compared in order, env and headers as key/value sets. Absent
    /// and empty collections are the same value. `extra` is ignored.
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.transport == other.transport && self.disabled == other.disabled
    }

    pub fn command(&self) -> Option<&str> {
        match &self.transport {
            Transport::Stdio { command, .. } => Some(command),
            Transport::Remote { .. } => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match &self.transport {
            Transport::Remote { url, .. } => Some(url),
            Transport::Stdio { .. } => None,
        }
    }

    /// One-line human summary, e.g. `node a.js` or `https://host/mcp`.
    pub fn summary(&self) -> String {
        let base = match &self.transport {
            Transport::Stdio { command, args, .. } => {
                if args.is_empty() {
                    command.clone()
                } else {
                    format!("{command} {}", args.join(" "))
                }
            },
            Transport::Remote { url, .. } => url.clone(),
        };
        if self.disabled {
            format!("{base} (disabled)")
        } else {
            base
        }
    }

    /// Parses one entry of a standard `mcpServers` map.
    ///
    /// # Errors
    ///
    /// Returns an error message if the entry is not a JSON object.
    pub fn from_standard_entry(name: &str, value: &Value) -> Result<Self, String> {
        let Value::Object(entry) = value else {
            return Err(format!("server `{name}` is not an object"));
        };

        let command = entry.get("command").and_then(Value::as_str).filter(|c| !c.is_empty());
        let url = entry.get("url").and_then(Value::as_str);

        let transport = match (command, url) {
            (None, Some(url)) => Transport::Remote {
                url: url.to_string(),
                headers: string_map(entry.get("headers")),
            },
            (command, _) => Transport::Stdio {
                command: command.unwrap_or_default().to_string(),
                args: string_list(entry.get("args")),
                env: string_map(entry.get("env")),
            },
        };

        let mut extra: Map<String, Value> = entry
            .iter()
            .filter(|(k, _)| !KNOWN_STANDARD_FIELDS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        // A stdio entry that also names a url keeps it so nothing is dropped.
        if let (Transport::Stdio { .. }, Some(url)) = (&transport, url) {
            extra.insert("url".to_string(), Value::String(url.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            transport,
            disabled: entry.get("disabled").and_then(Value::as_bool).unwrap_or(false),
            extra,
        })
    }

    /// Renders the entry value for a standard `mcpServers` map.
    pub fn to_standard_entry(&self) -> Value {
        let mut entry = Map::new();

        match &self.transport {
            Transport::Stdio { command, args, env } => {
                if !command.is_empty() {
                    entry.insert("command".to_string(), Value::String(command.clone()));
                }
                if !args.is_empty() {
                    entry.insert("args".to_string(), string_array(args));
                }
                if !env.is_empty() {
                    entry.insert("env".to_string(), string_object(env));
                }
            },
            Transport::Remote { url, headers } => {
                entry.insert("url".to_string(), Value::String(url.clone()));
                if !headers.is_empty() {
                    entry.insert("headers".to_string(), string_object(headers));
                }
            },
        }

        if self.disabled {
            entry.insert("disabled".to_string(), Value::Bool(true));
        }

        for (key, value) in &self.extra {
            entry.entry(key.clone()).or_insert_with(|| value.clone());
        }

        Value::Object(entry)
    }
}

pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

pub(crate) fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| match v {
                    Value::String(s) => Some((k.clone(), s.clone())),
                    Value::Number(n) => Some((k.clone(), n.to_string())),
                    Value::Bool(b) => Some((k.clone(), b.to_string())),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn string_array(items: &[String]) -> Value {
    Value::Array(items.iter().map(|s| Value::String(s.clone())).collect())
}

pub(crate) fn string_object(map: &BTreeMap<String, String>) -> Value {
    Value::Object(map.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect())
}

/// Locations of mcpsync's own files.
#[derive(Debug, Clone)]
pub struct Config {
    pub config_dir: PathBuf,
    pub registry_path: PathBuf,
    pub app_config_path: PathBuf,
}

impl Config {
    /// Creates a Config rooted at the default configuration directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self::with_dir(Self::get_config_dir()?))
    }

    pub fn with_dir<P: Into<PathBuf>>(config_dir: P) -> Self {
        let config_dir = config_dir.into();
        Self {
            registry_path: config_dir.join(REGISTRY_FILE_NAME),
            app_config_path: config_dir.join(APP_CONFIG_FILE_NAME),
            config_dir,
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Gets the configuration directory path.
    ///
    /// # Errors
    ///
    /// Returns an error if neither `XDG_CONFIG_HOME` nor a home directory is available.
    pub fn get_config_dir() -> anyhow::Result<PathBuf> {
        // Use XDG_CONFIG_HOME or fallback to ~/.config
        let config_dir = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg_config).join("mcpsync")
        } else {
            directories::BaseDirs::new()
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
                .home_dir()
                .join(".config")
                .join("mcpsync")
        };
        Ok(config_dir)
    }
}
