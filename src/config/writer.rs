use super::reader::REGISTRY_SECTION;
use super::ServerDefinition;
use crate::RegistryError;
use chrono::Local;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Render the registry document for `servers`, pretty printed with a trailing newline.
pub fn render_registry_document(servers: &[ServerDefinition]) -> String {
    let entries: Map<String, Value> =
        servers.iter().map(|s| (s.name.clone(), s.to_standard_entry())).collect();

    let mut root = Map::new();
    root.insert(REGISTRY_SECTION.to_string(), Value::Object(entries));

    // Serializing a Value cannot fail.
    let mut json = serde_json::to_string_pretty(&Value::Object(root)).unwrap_or_default();
    json.push('\n');
    json
}

/// Write the registry document atomically.
///
/// # Errors
///
/// Returns an error if:
/// - Unable to create parent directories
/// - Unable to write to the file
pub fn write_registry_document<P: AsRef<Path>>(
    path: P,
    servers: &[ServerDefinition],
) -> Result<(), RegistryError> {
    let path_ref = path.as_ref();
    write_atomic(path_ref, &render_registry_document(servers))
        .map_err(|source| RegistryError::Write { path: path_ref.to_path_buf(), source })
}

/// Replace `path` with `content` through a temporary file in the same directory.
///
/// Readers see either the old or the new content, never a partial write.
///
/// # Errors
///
/// Returns an error if:
/// - Unable to create parent directories
/// - Unable to create or write the temporary file
/// - Unable to rename the temporary file over `path`
pub fn write_atomic<P: AsRef<Path>>(path: P, content: &str) -> std::io::Result<()> {
    let path_ref = path.as_ref();

    // Ensure parent directory exists
    let parent = match path_ref.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(&parent)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;

    if let Ok(metadata) = fs::metadata(path_ref) {
        fs::set_permissions(temp.path(), metadata.permissions())?;
    }

    temp.persist(path_ref).map_err(|e| e.error)?;
    Ok(())
}

/// Create a backup of a file with timestamp
///
/// # Errors
///
/// Returns an error if unable to copy the file
pub fn backup_file<P: AsRef<Path>>(path: P) -> std::io::Result<Option<PathBuf>> {
    let path_ref = path.as_ref();

    if !path_ref.exists() {
        return Ok(None);
    }

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let backup_path = path_ref.with_file_name(format!(
        "{}.backup.{}",
        path_ref.file_name().and_then(|n| n.to_str()).unwrap_or("config"),
        timestamp
    ));

    fs::copy(path_ref, &backup_path)?;

    Ok(Some(backup_path))
}
