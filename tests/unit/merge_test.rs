use crate::fixtures::stdio;
use mcpsync::{
    config::ServerDefinition,
    merge::{final_servers, merge, ConflictChoice, ConflictResolutions},
};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

fn server_list() -> impl Strategy<Value = Vec<ServerDefinition>> {
    prop::collection::btree_map("[a-f]", prop::sample::select(vec!["node", "deno", "uvx"]), 0..6)
        .prop_map(|entries| entries.into_iter().map(|(name, command)| stdio(&name, command)).collect())
}

fn names(servers: &[ServerDefinition]) -> BTreeSet<String> {
    servers.iter().map(|s| s.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_server_is_added() {
        let source = vec![ServerDefinition::stdio("fs", "node", ["a.js"])];
        let result = merge("claude-code", &source, &[]);

        assert_eq!(result.added, source);
        assert!(result.kept.is_empty());
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn test_identical_server_is_kept() {
        let result = merge("claude-code", &[stdio("fs", "node")], &[stdio("fs", "node")]);

        assert!(result.added.is_empty());
        assert_eq!(result.kept, vec![stdio("fs", "node")]);
        assert!(!result.has_changes());
    }

    #[test]
    fn test_different_definition_is_conflict() {
        let result = merge("claude-code", &[stdio("fs", "node")], &[stdio("fs", "python")]);

        assert_eq!(result.conflicts.len(), 1);
        let conflict = &result.conflicts[0];
        assert_eq!(conflict.name, "fs");
        assert_eq!(conflict.source.command(), Some("node"));
        assert_eq!(conflict.target.command(), Some("python"));
    }

    #[test]
    fn test_target_only_server_is_untouched() {
        let target = vec![stdio("fs", "python"), stdio("git", "uvx")];
        let result = merge("claude-code", &[stdio("fs", "node")], &target);

        assert!(result.added.iter().chain(&result.kept).all(|s| s.name != "git"));
        assert!(result.conflicts.iter().all(|c| c.name != "git"));

        let resolved = final_servers(&result, &target, None);
        assert_eq!(resolved, vec![stdio("fs", "node"), stdio("git", "uvx")]);
    }

    #[test]
    fn test_disabled_flag_makes_a_difference() {
        let result = merge("amp", &[stdio("fs", "node").with_disabled(true)], &[stdio("fs", "node")]);
        assert_eq!(result.conflicts.len(), 1);
    }

    #[test]
    fn test_explicit_target_choice() {
        let target = vec![stdio("fs", "python")];
        let result = merge("amp", &[stdio("fs", "node"), stdio("new", "x")], &target);
        let keep = ConflictResolutions::from_choices(
            &result,
            &HashMap::from([("fs".to_string(), ConflictChoice::Target)]),
        );

        assert_eq!(keep.choice_for(&result, "fs"), ConflictChoice::Target);
        assert_eq!(
            final_servers(&result, &target, Some(&keep)),
            vec![stdio("fs", "python"), stdio("new", "x")]
        );
    }

    proptest! {
        #[test]
        fn prop_source_names_are_partitioned(source in server_list(), target in server_list()) {
            let result = merge("codex", &source, &target);

            let added = names(&result.added);
            let kept = names(&result.kept);
            let conflicted: BTreeSet<String> = result.conflicts.iter().map(|c| c.name.clone()).collect();

            prop_assert!(added.is_disjoint(&kept));
            prop_assert!(added.is_disjoint(&conflicted));
            prop_assert!(kept.is_disjoint(&conflicted));

            let union: BTreeSet<String> = added.iter().chain(&kept).chain(&conflicted).cloned().collect();
            prop_assert_eq!(union, names(&source));
            prop_assert_eq!(result.added.len() + result.kept.len() + result.conflicts.len(), source.len());
        }

        #[test]
        fn prop_conflicts_are_symmetric(a in server_list(), b in server_list()) {
            let forward: BTreeSet<String> =
                merge("codex", &a, &b).conflicts.into_iter().map(|c| c.name).collect();
            let backward: BTreeSet<String> =
                merge("codex", &b, &a).conflicts.into_iter().map(|c| c.name).collect();
            prop_assert_eq!(forward, backward);
        }

        #[test]
        fn prop_apply_never_drops_target_servers(source in server_list(), target in server_list()) {
            let result = merge("codex", &source, &target);
            let resolved = final_servers(&result, &target, None);

            let expected: BTreeSet<String> = names(&source).union(&names(&target)).cloned().collect();
            prop_assert_eq!(names(&resolved), expected);
            prop_assert_eq!(resolved.len(), names(&resolved).len());

            for server in &target {
                if !source.iter().any(|s| s.name == server.name) {
                    prop_assert!(resolved.contains(server));
                }
            }
        }

        #[test]
        fn prop_merge_after_apply_is_clean(source in server_list(), target in server_list()) {
            let first = merge("codex", &source, &target);
            let resolved = final_servers(&first, &target, None);
            let second = merge("codex", &source, &resolved);

            prop_assert!(!second.has_changes());
            prop_assert_eq!(second.kept.len(), source.len());
        }

        #[test]
        fn prop_default_resolution_is_all_source(source in server_list(), target in server_list()) {
            let result = merge("codex", &source, &target);
            let all_source = ConflictResolutions::uniform(&result, ConflictChoice::Source);
            prop_assert_eq!(
                final_servers(&result, &target, None),
                final_servers(&result, &target, Some(&all_source))
            );
        }
    }
}
