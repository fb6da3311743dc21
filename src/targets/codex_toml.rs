//! Codex keeps its servers as `[mcp_servers.<name>]` tables in `config.toml`.
//! Edits go through `toml_edit` so comments and layout outside the replaced
//! tables survive byte for byte.

use super::ParsedServers;
use crate::config::{ServerDefinition, Transport};
use serde_json::Map;
use std::collections::{BTreeMap, HashMap};
use toml_edit::{Array, DocumentMut, InlineTable, Item, Table, TableLike, Value};

const SECTION: &str = "mcp_servers";

/// Keys owned by [`ServerDefinition`]; anything else on a replaced table is kept.
const KNOWN_KEYS: &[&str] = &["command", "args", "env", "url", "http_headers", "enabled"];

/// Decode `[mcp_servers]` from Codex config text.
///
/// # Errors
///
/// Returns a message for invalid TOML or a non-table `mcp_servers` or entry.
pub fn parse(text: &str) -> Result<ParsedServers, String> {
    let doc = parse_document(text)?;
    decode_section(&doc)
}

/// Render Codex config text with `[mcp_servers]` holding `final_servers`.
///
/// # Errors
///
/// Returns a message if `current` is not valid TOML or `mcp_servers` is not a table.
pub fn render(current: Option<&str>, final_servers: &[ServerDefinition]) -> Result<String, String> {
    let mut doc = parse_document(current.unwrap_or_default())?;
    let existing = decode_section(&doc)?;
    let existing_by_name: HashMap<&str, &ServerDefinition> =
        existing.servers.iter().map(|s| (s.name.as_str(), s)).collect();

    let pending: Vec<&ServerDefinition> = final_servers
        .iter()
        .filter(|server| {
            !existing_by_name.get(server.name.as_str()).is_some_and(|cur| cur.is_equivalent(server))
        })
        .collect();

    if pending.is_empty() {
        return Ok(current.unwrap_or_default().to_string());
    }

    if !doc.contains_key(SECTION) {
        let mut servers = Table::new();
        servers.set_implicit(true);
        doc.insert(SECTION, Item::Table(servers));
    }
    let servers = doc
        .get_mut(SECTION)
        .and_then(Item::as_table_mut)
        .ok_or_else(|| format!("`{SECTION}` must be a table to be updated"))?;

    for server in pending {
        let item = match servers.get(&server.name) {
            Some(old) => replacement_item(old, server),
            None => Item::Table(encode_table(server)),
        };
        servers.insert(&server.name, item);
    }

    let mut output = doc.to_string();
    if super::wants_trailing_newline(current) && !output.ends_with('\n') {
        output.push('\n');
    }
    Ok(output)
}

fn parse_document(text: &str) -> Result<DocumentMut, String> {
    text.parse::<DocumentMut>().map_err(|e| e.to_string().trim_end().to_string())
}

fn decode_section(doc: &DocumentMut) -> Result<ParsedServers, String> {
    let Some(section) = doc.get(SECTION) else {
        return Ok(ParsedServers::default());
    };
    let entries =
        section.as_table_like().ok_or_else(|| format!("`{SECTION}` is not a table"))?;

    let servers = entries
        .iter()
        .map(|(name, item)| decode_entry(name, item))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ParsedServers { servers, has_section: true })
}

fn decode_entry(name: &str, item: &Item) -> Result<ServerDefinition, String> {
    let entry: &dyn TableLike =
        item.as_table_like().ok_or_else(|| format!("server `{name}` is not a table"))?;

    let command = entry.get("command").and_then(Item::as_str).filter(|c| !c.is_empty());
    let url = entry.get("url").and_then(Item::as_str);

    let transport = match (command, url) {
        (None, Some(url)) => Transport::Remote {
            url: url.to_string(),
            headers: string_table(entry.get("http_headers")),
        },
        (command, _) => Transport::Stdio {
            command: command.unwrap_or_default().to_string(),
            args: entry
                .get("args")
                .and_then(Item::as_array)
                .map(|args| args.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
            env: string_table(entry.get("env")),
        },
    };

    Ok(ServerDefinition {
        name: name.to_string(),
        transport,
        disabled: entry.get("enabled").and_then(Item::as_bool) == Some(false),
        extra: Map::new(),
    })
}

fn string_table(item: Option<&Item>) -> BTreeMap<String, String> {
    item.and_then(Item::as_table_like)
        .map(|table| {
            table
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.to_string(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn encode_table(server: &ServerDefinition) -> Table {
    let mut table = Table::new();
    match &server.transport {
        Transport::Stdio { command, args, env } => {
            table.insert("command", toml_edit::value(command.as_str()));
            if !args.is_empty() {
                let array: Array = args.iter().map(String::as_str).collect();
                table.insert("args", toml_edit::value(array));
            }
            if !env.is_empty() {
                table.insert("env", toml_edit::value(inline_strings(env)));
            }
        },
        Transport::Remote { url, headers } => {
            table.insert("url", toml_edit::value(url.as_str()));
            if !headers.is_empty() {
                table.insert("http_headers", toml_edit::value(inline_strings(headers)));
            }
        },
    }
    if server.disabled {
        table.insert("enabled", toml_edit::value(false));
    }
    table
}

fn inline_strings(map: &BTreeMap<String, String>) -> InlineTable {
    let mut table = InlineTable::new();
    for (key, value) in map {
        table.insert(key.as_str(), Value::from(value.as_str()));
    }
    table
}

/// New item for an existing entry: the definition's keys are rewritten, other
/// keys (timeouts, tool filters) and the table's decoration are carried over.
fn replacement_item(old: &Item, server: &ServerDefinition) -> Item {
    let mut table = encode_table(server);

    if let Some(old_entry) = old.as_table_like() {
        for (key, value) in old_entry.iter() {
            if !KNOWN_KEYS.contains(&key) {
                table.insert(key, value.clone());
            }
        }
    }

    match old {
        Item::Table(old_table) => {
            *table.decor_mut() = old_table.decor().clone();
            if let Some(position) = old_table.position() {
                table.set_position(position);
            }
            Item::Table(table)
        },
        Item::Value(Value::InlineTable(_)) => toml_edit::value(table.into_inline_table()),
        _ => Item::Table(table),
    }
}
