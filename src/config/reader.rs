use super::ServerDefinition;
use crate::RegistryError;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Top-level key of the registry document.
pub const REGISTRY_SECTION: &str = "mcpServers";

/// Read the registry document (`{"mcpServers": {...}}`).
///
/// A missing file is an empty list. Entries keep the order they have in the file.
///
/// # Errors
///
/// Returns an error if:
/// - Unable to read the file (when it exists)
/// - The content is not a JSON object or `mcpServers` is not an object
/// - An entry is not an object
pub fn read_registry_document<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<ServerDefinition>, RegistryError> {
    let path_ref = path.as_ref();

    if !path_ref.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path_ref)
        .map_err(|source| RegistryError::Read { path: path_ref.to_path_buf(), source })?;

    parse_registry_document(&content)
        .map_err(|message| RegistryError::Parse { path: path_ref.to_path_buf(), message })
}

/// Parse registry document text. Blank text is an empty list.
///
/// # Errors
///
/// Returns a message describing the first structural problem.
pub fn parse_registry_document(content: &str) -> Result<Vec<ServerDefinition>, String> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let root: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let Value::Object(root) = root else {
        return Err("document root is not an object".to_string());
    };

    match root.get(REGISTRY_SECTION) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(servers)) => servers
            .iter()
            .map(|(name, entry)| ServerDefinition::from_standard_entry(name, entry))
            .collect(),
        Some(_) => Err(format!("`{REGISTRY_SECTION}` is not an object")),
    }
}
