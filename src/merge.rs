#![allow(clippy::self_named_module_files)]

use crate::config::ServerDefinition;
use anyhow::Result;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::warn;

pub mod resolution;

pub use resolution::{final_servers, ConflictChoice, ConflictResolutions};

/// A source server whose name exists in the target with a different definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerConflict {
    pub name: String,
    pub source: ServerDefinition,
    pub target: ServerDefinition,
}

/// Outcome of merging the source list into one target.
///
/// Every source name lands in exactly one of `added`, `kept` or `conflicts`.
/// Names only the target knows appear in none of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeResult {
    pub tool_id: String,
    pub added: Vec<ServerDefinition>,
    pub kept: Vec<ServerDefinition>,
    pub conflicts: Vec<ServerConflict>,
}

impl MergeResult {
    /// True when applying would add a server or has a conflict to settle.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.conflicts.is_empty()
    }

    pub fn conflict(&self, name: &str) -> Option<&ServerConflict> {
        self.conflicts.iter().find(|c| c.name == name)
    }
}

/// Merge `source` into a target currently holding `target`.
///
/// One pass over the source in order. A later duplicate name in the source is
/// skipped with a warning.
pub fn merge(tool_id: &str, source: &[ServerDefinition], target: &[ServerDefinition]) -> MergeResult {
    let mut target_by_name: HashMap<&str, &ServerDefinition> = HashMap::with_capacity(target.len());
    for server in target {
        target_by_name.entry(server.name.as_str()).or_insert(server);
    }

    let mut result = MergeResult { tool_id: tool_id.to_string(), ..MergeResult::default() };
    let mut seen: HashSet<&str> = HashSet::with_capacity(source.len());

    for server in source {
        if !seen.insert(server.name.as_str()) {
            warn!("Duplicate server name `{}` in source list; using the first definition", server.name);
            continue;
        }

        match target_by_name.get(server.name.as_str()) {
            None => result.added.push(server.clone()),
            Some(existing) if existing.is_equivalent(server) => result.kept.push(server.clone()),
            Some(existing) => result.conflicts.push(ServerConflict {
                name: server.name.clone(),
                source: server.clone(),
                target: (*existing).clone(),
            }),
        }
    }

    result
}

/// Ask on stdin which side of a conflict to keep.
///
/// # Errors
///
/// Returns an error if:
/// - Standard output cannot be flushed
/// - Reading from standard input fails
pub fn prompt_resolve_conflict(tool_name: &str, conflict: &ServerConflict) -> Result<ConflictChoice> {
    use std::io::{self, Write};

    println!("\n=== Conflict in {tool_name}: {} ===", conflict.name);
    println!("  Source: {}", conflict.source.summary());
    println!("  Target: {}", conflict.target.summary());
    print!("\nOverwrite with the source version? [Y/n] ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(parse_choice_answer(&input))
}

/// Empty or `y` means source, `n` means target.
fn parse_choice_answer(input: &str) -> ConflictChoice {
    if input.trim().eq_ignore_ascii_case("n") || input.trim().eq_ignore_ascii_case("no") {
        ConflictChoice::Target
    } else {
        ConflictChoice::Source
    }
}
