//! Reading server lists out of other tools' config files.

use crate::config::ServerDefinition;
use crate::targets::json::{self, JsonLayout};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Layouts tried in order; the first with a non-empty collection wins.
const DETECTION_ORDER: [JsonLayout; 4] =
    [JsonLayout::Amp, JsonLayout::OpenCode, JsonLayout::Copilot, JsonLayout::Standard];

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("reference file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error(
        "no MCP servers found in {origin}; expected one of: mcpServers, amp.mcpServers, servers, mcp"
    )]
    UnrecognizedFormat { origin: String },
}

/// Servers found in a reference file.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportResult {
    pub servers: Vec<ServerDefinition>,
    pub source_path: Option<PathBuf>,
    pub detected_format: JsonLayout,
}

/// Detect the layout of `content` and decode its servers.
///
/// # Errors
///
/// Returns an error if the content is not a JSON object, a detected collection
/// is malformed, or no layout yields any server.
pub fn parse_config_content(content: &str) -> Result<ImportResult, ImportError> {
    detect(content, "input").map(|(servers, detected_format)| ImportResult {
        servers,
        source_path: None,
        detected_format,
    })
}

/// Read `path` and decode its servers, see [`parse_config_content`].
///
/// # Errors
///
/// Returns an error if the file is missing or unreadable, or its content is rejected.
pub fn parse_config_file<P: AsRef<Path>>(path: P) -> Result<ImportResult, ImportError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            ImportError::NotFound(path.to_path_buf())
        } else {
            ImportError::Read { path: path.to_path_buf(), source }
        }
    })?;

    let (servers, detected_format) = detect(&content, &path.display().to_string())?;
    debug!(
        "Imported {} servers from {} ({} format)",
        servers.len(),
        path.display(),
        detected_format.name()
    );

    Ok(ImportResult { servers, source_path: Some(path.to_path_buf()), detected_format })
}

fn detect(content: &str, origin: &str) -> Result<(Vec<ServerDefinition>, JsonLayout), ImportError> {
    let parse_error = |message: String| ImportError::Parse { origin: origin.to_string(), message };

    let root = match serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))? {
        Value::Object(root) => root,
        _ => return Err(parse_error("document root is not an object".to_string())),
    };
    let has_mcp_key = root.contains_key("mcp");

    for layout in DETECTION_ORDER {
        // Copilot's `servers` only counts when there is no OpenCode `mcp` key.
        if layout == JsonLayout::Copilot && has_mcp_key {
            continue;
        }
        if !json::has_object_section(layout, &root) {
            debug!("{origin}: no `{}` object, skipping {} layout", layout.section_label(), layout.name());
            continue;
        }
        let parsed = json::parse(layout, content).map_err(parse_error)?;
        if !parsed.servers.is_empty() {
            return Ok((parsed.servers, layout));
        }
    }

    Err(ImportError::UnrecognizedFormat { origin: origin.to_string() })
}
