use super::MergeResult;
use crate::config::ServerDefinition;
use std::collections::{BTreeMap, HashMap};

/// Which side of a conflict wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ConflictChoice {
    /// Overwrite the target entry with the source definition
    #[default]
    Source,
    /// Keep the target's current entry
    Target,
}

/// Per-name overrides of the default (source-wins) conflict resolution.
///
/// Names that are not conflicts of the merge they are applied to are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConflictResolutions {
    overrides: BTreeMap<String, ServerDefinition>,
}

impl ConflictResolutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `server` for the conflict named `server.name`.
    pub fn insert(&mut self, server: ServerDefinition) {
        self.overrides.insert(server.name.clone(), server);
    }

    pub fn get(&self, name: &str) -> Option<&ServerDefinition> {
        self.overrides.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    /// Build overrides from a name → choice map against `merge`'s conflicts.
    pub fn from_choices<S: std::hash::BuildHasher>(
        merge: &MergeResult,
        choices: &HashMap<String, ConflictChoice, S>,
    ) -> Self {
        let mut resolutions = Self::new();
        for conflict in &merge.conflicts {
            let chosen = match choices.get(&conflict.name).copied().unwrap_or_default() {
                ConflictChoice::Source => &conflict.source,
                ConflictChoice::Target => &conflict.target,
            };
            resolutions.insert(chosen.clone());
        }
        resolutions
    }

    /// Apply the same choice to every conflict of `merge`.
    pub fn uniform(merge: &MergeResult, choice: ConflictChoice) -> Self {
        let choices: HashMap<String, ConflictChoice> =
            merge.conflicts.iter().map(|c| (c.name.clone(), choice)).collect();
        Self::from_choices(merge, &choices)
    }

    /// Which side the override for `name` picks, if it matches one exactly.
    pub fn choice_for(&self, merge: &MergeResult, name: &str) -> ConflictChoice {
        match (self.get(name), merge.conflict(name)) {
            (Some(chosen), Some(conflict))
                if chosen.is_equivalent(&conflict.target)
                    && !chosen.is_equivalent(&conflict.source) =>
            {
                ConflictChoice::Target
            },
            _ => ConflictChoice::Source,
        }
    }
}

impl FromIterator<ServerDefinition> for ConflictResolutions {
    fn from_iter<I: IntoIterator<Item = ServerDefinition>>(iter: I) -> Self {
        let mut resolutions = Self::new();
        for server in iter {
            resolutions.insert(server);
        }
        resolutions
    }
}

/// The full collection a target should hold after applying `merge`.
///
/// Target servers keep their existing order, with each conflict replaced by its
/// resolution (the override if given, otherwise the source version). New
/// servers follow in source order.
pub fn final_servers(
    merge: &MergeResult,
    target_servers: &[ServerDefinition],
    overrides: Option<&ConflictResolutions>,
) -> Vec<ServerDefinition> {
    let mut result = Vec::with_capacity(target_servers.len() + merge.added.len());

    for existing in target_servers {
        let resolved = merge.conflict(&existing.name).map(|conflict| {
            overrides
                .and_then(|o| o.get(&conflict.name))
                .unwrap_or(&conflict.source)
                .clone()
                .with_name(conflict.name.clone())
        });
        result.push(resolved.unwrap_or_else(|| existing.clone()));
    }

    result.extend(merge.added.iter().cloned());
    result
}
