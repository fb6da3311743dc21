use super::{wants_trailing_newline, ParsedServers};
use crate::config::{string_array, string_list, string_map, string_object, ServerDefinition, Transport};
use serde_json::{Map, Value};
use splice::{Edit, ObjectSpan};
use std::collections::HashMap;

mod splice;

/// Literal top-level key Amp uses for its servers.
const AMP_DOTTED_KEY: &str = "amp.mcpServers";

/// Shape of the server collection inside a JSON target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonLayout {
    /// `mcpServers` map of `{command, args, env}` / `{url, headers}` entries.
    Standard,
    /// Standard entries under `amp.mcpServers`, either a literal dotted key or nested.
    Amp,
    /// `servers` map with `type` = `local` or `http`.
    Copilot,
    /// `mcp` map with a `command` array, `environment` and `enabled`.
    OpenCode,
}

impl JsonLayout {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Amp => "amp",
            Self::Copilot => "copilot",
            Self::OpenCode => "opencode",
        }
    }

    pub const fn section_label(self) -> &'static str {
        match self {
            Self::Standard => "mcpServers",
            Self::Amp => AMP_DOTTED_KEY,
            Self::Copilot => "servers",
            Self::OpenCode => "mcp",
        }
    }
}

/// Decode the server collection of `layout` from `text`.
///
/// # Errors
///
/// Returns a message if the text is not a JSON object, the collection is not an
/// object, or an entry is malformed.
pub fn parse(layout: JsonLayout, text: &str) -> Result<ParsedServers, String> {
    let root = parse_root(text)?;
    decode_section(layout, &root)
}

/// Render `text` with the collection updated to hold `final_servers`.
///
/// Only entries that change are rewritten; everything else keeps its bytes.
/// When nothing changes the current text (or the empty string for a missing
/// file) is returned as is.
///
/// # Errors
///
/// Returns a message if `current` cannot be parsed.
pub fn render(
    layout: JsonLayout,
    current: Option<&str>,
    final_servers: &[ServerDefinition],
) -> Result<String, String> {
    let original = current.unwrap_or_default();
    let root = parse_root(original)?;
    let existing = decode_section(layout, &root)?;
    let existing_by_name: HashMap<&str, &ServerDefinition> =
        existing.servers.iter().map(|s| (s.name.as_str(), s)).collect();

    let pending: Vec<&ServerDefinition> = final_servers
        .iter()
        .filter(|server| {
            !existing_by_name.get(server.name.as_str()).is_some_and(|cur| cur.is_equivalent(server))
        })
        .collect();

    if pending.is_empty() {
        return Ok(original.to_string());
    }
    if original.trim().is_empty() {
        return render_new(layout, &pending, current);
    }

    let edits = section_edits(layout, original, &root, &pending)?;
    Ok(splice::apply(original, edits))
}

fn render_new(
    layout: JsonLayout,
    pending: &[&ServerDefinition],
    current: Option<&str>,
) -> Result<String, String> {
    let mut root = Map::new();
    if layout == JsonLayout::Amp {
        root.insert("amp".to_string(), wrapped_amp(layout, pending));
    } else {
        root.insert(layout.section_label().to_string(), Value::Object(new_entries(layout, pending)));
    }

    let mut output = serde_json::to_string_pretty(&Value::Object(root)).map_err(|e| e.to_string())?;
    if wants_trailing_newline(current) {
        output.push('\n');
    }
    Ok(output)
}

/// Whether `root` holds the collection of `layout` as an object.
pub fn has_object_section(layout: JsonLayout, root: &Map<String, Value>) -> bool {
    find_section(layout, root).is_some_and(Value::is_object)
}

fn parse_root(text: &str) -> Result<Map<String, Value>, String> {
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str(text).map_err(|e| e.to_string())? {
        Value::Object(root) => Ok(root),
        _ => Err("document root is not an object".to_string()),
    }
}

fn find_section(layout: JsonLayout, root: &Map<String, Value>) -> Option<&Value> {
    let section = match layout {
        JsonLayout::Standard => root.get("mcpServers"),
        JsonLayout::Amp => root
            .get(AMP_DOTTED_KEY)
            .or_else(|| root.get("amp").and_then(|amp| amp.get("mcpServers"))),
        JsonLayout::Copilot => root.get("servers"),
        JsonLayout::OpenCode => root.get("mcp"),
    };
    section.filter(|value| !value.is_null())
}

fn decode_section(layout: JsonLayout, root: &Map<String, Value>) -> Result<ParsedServers, String> {
    let Some(section) = find_section(layout, root) else {
        return Ok(ParsedServers::default());
    };
    let Value::Object(entries) = section else {
        return Err(format!("`{}` is not an object", layout.section_label()));
    };

    let servers = entries
        .iter()
        .map(|(name, entry)| decode_entry(layout, name, entry))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ParsedServers { servers, has_section: true })
}

/// Edits writing `pending` into the collection [`find_section`] reads.
///
/// With no collection yet, Amp gets the literal dotted key when the file
/// already uses flat `amp.*` keys, and a nested `amp.mcpServers` otherwise.
fn section_edits(
    layout: JsonLayout,
    text: &str,
    root_value: &Map<String, Value>,
    pending: &[&ServerDefinition],
) -> Result<Vec<Edit>, String> {
    let root = splice::root_object(text)?;
    if layout != JsonLayout::Amp {
        return upsert_section(layout, text, &root, layout.section_label(), pending);
    }

    let literal_found = root_value.get(AMP_DOTTED_KEY).is_some_and(|v| !v.is_null());
    let nested_found = root_value
        .get("amp")
        .and_then(|amp| amp.get("mcpServers"))
        .is_some_and(|v| !v.is_null());
    let flat = literal_found
        || (!nested_found && root_value.keys().any(|k| k.starts_with("amp.")));
    if flat {
        return upsert_section(layout, text, &root, AMP_DOTTED_KEY, pending);
    }

    match root.member("amp") {
        Some(amp) if amp.is_object(text) => {
            let amp_object = splice::object_at(text, amp.value.start)?;
            upsert_section(layout, text, &amp_object, "mcpServers", pending)
        },
        Some(amp) if amp.is_null(text) => {
            Ok(vec![splice::replace_value(text, &root, amp, &wrapped_amp(layout, pending))?])
        },
        Some(_) => Err("`amp` is not an object".to_string()),
        None => Ok(vec![splice::append_members(
            text,
            &root,
            &[("amp".to_string(), wrapped_amp(layout, pending))],
        )?]),
    }
}

/// Edits for the collection stored under `key` of `parent`.
fn upsert_section(
    layout: JsonLayout,
    text: &str,
    parent: &ObjectSpan,
    key: &str,
    pending: &[&ServerDefinition],
) -> Result<Vec<Edit>, String> {
    let Some(member) = parent.member(key) else {
        let section = Value::Object(new_entries(layout, pending));
        return Ok(vec![splice::append_members(text, parent, &[(key.to_string(), section)])?]);
    };
    if member.is_null(text) {
        let section = Value::Object(new_entries(layout, pending));
        return Ok(vec![splice::replace_value(text, parent, member, &section)?]);
    }
    if !member.is_object(text) {
        return Err(format!("`{key}` is not an object"));
    }

    let section = splice::object_at(text, member.value.start)?;
    let mut edits = Vec::new();
    let mut appended = Vec::new();
    for server in pending {
        let entry = encode_entry(layout, server);
        match section.member(&server.name) {
            // Existing keys keep their position; new keys land at the end.
            Some(existing) => edits.push(splice::replace_value(text, &section, existing, &entry)?),
            None => appended.push((server.name.clone(), entry)),
        }
    }
    if !appended.is_empty() {
        edits.push(splice::append_members(text, &section, &appended)?);
    }
    Ok(edits)
}

fn new_entries(layout: JsonLayout, servers: &[&ServerDefinition]) -> Map<String, Value> {
    servers.iter().map(|s| (s.name.clone(), encode_entry(layout, s))).collect()
}

fn wrapped_amp(layout: JsonLayout, pending: &[&ServerDefinition]) -> Value {
    Value::Object(Map::from_iter([(
        "mcpServers".to_string(),
        Value::Object(new_entries(layout, pending)),
    )]))
}

fn decode_entry(layout: JsonLayout, name: &str, value: &Value) -> Result<ServerDefinition, String> {
    match layout {
        JsonLayout::Standard | JsonLayout::Amp => ServerDefinition::from_standard_entry(name, value),
        JsonLayout::Copilot => {
            // Same field names as the standard layout; `type` and `tools` are not carried.
            let mut server = ServerDefinition::from_standard_entry(name, value)?;
            server.extra.clear();
            Ok(server)
        },
        JsonLayout::OpenCode => decode_opencode(name, value),
    }
}

fn encode_entry(layout: JsonLayout, server: &ServerDefinition) -> Value {
    match layout {
        JsonLayout::Standard | JsonLayout::Amp => server.to_standard_entry(),
        JsonLayout::Copilot => encode_copilot(server),
        JsonLayout::OpenCode => encode_opencode(server),
    }
}

fn encode_copilot(server: &ServerDefinition) -> Value {
    let mut entry = Map::new();
    match &server.transport {
        Transport::Stdio { command, args, env } => {
            entry.insert("type".to_string(), Value::String("local".to_string()));
            entry.insert("command".to_string(), Value::String(command.clone()));
            entry.insert("args".to_string(), string_array(args));
            if !env.is_empty() {
                entry.insert("env".to_string(), string_object(env));
            }
        },
        Transport::Remote { url, headers } => {
            entry.insert("type".to_string(), Value::String("http".to_string()));
            entry.insert("url".to_string(), Value::String(url.clone()));
            if !headers.is_empty() {
                entry.insert("headers".to_string(), string_object(headers));
            }
        },
    }
    if server.disabled {
        entry.insert("disabled".to_string(), Value::Bool(true));
    }
    Value::Object(entry)
}

fn decode_opencode(name: &str, value: &Value) -> Result<ServerDefinition, String> {
    let Value::Object(entry) = value else {
        return Err(format!("server `{name}` is not an object"));
    };

    let is_remote = entry.get("type").and_then(Value::as_str) == Some("remote")
        || (entry.get("command").is_none() && entry.get("url").is_some());

    let transport = if is_remote {
        Transport::Remote {
            url: entry.get("url").and_then(Value::as_str).unwrap_or_default().to_string(),
            headers: string_map(entry.get("headers")),
        }
    } else {
        let (command, args) = match entry.get("command") {
            Some(Value::Array(_)) => {
                let mut parts = string_list(entry.get("command")).into_iter();
                (parts.next().unwrap_or_default(), parts.collect())
            },
            Some(Value::String(command)) => (command.clone(), string_list(entry.get("args"))),
            _ => (String::new(), Vec::new()),
        };
        Transport::Stdio { command, args, env: string_map(entry.get("environment")) }
    };

    Ok(ServerDefinition {
        name: name.to_string(),
        transport,
        disabled: entry.get("enabled").and_then(Value::as_bool) == Some(false),
        extra: Map::new(),
    })
}

fn encode_opencode(server: &ServerDefinition) -> Value {
    let mut entry = Map::new();
    match &server.transport {
        Transport::Stdio { command, args, env } => {
            entry.insert("type".to_string(), Value::String("local".to_string()));
            let mut parts = Vec::with_capacity(args.len() + 1);
            parts.push(command.clone());
            parts.extend(args.iter().cloned());
            entry.insert("command".to_string(), string_array(&parts));
            if !env.is_empty() {
                entry.insert("environment".to_string(), string_object(env));
            }
        },
        Transport::Remote { url, headers } => {
            entry.insert("type".to_string(), Value::String("remote".to_string()));
            entry.insert("url".to_string(), Value::String(url.clone()));
            if !headers.is_empty() {
                entry.insert("headers".to_string(), string_object(headers));
            }
        },
    }
    entry.insert("enabled".to_string(), Value::Bool(!server.disabled));
    Value::Object(entry)
}
