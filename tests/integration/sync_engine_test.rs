use crate::fixtures::{standard_document, stdio, TestFixture};
use mcpsync::{
    config::ServerDefinition,
    merge::{ConflictChoice, ConflictResolutions},
    registry::Registry,
    status::SyncStatus,
    sync_operations::SyncEngine,
    targets::{Target, TargetKind},
};
use std::collections::HashMap;
use std::fs;

const CLAUDE_JSON: &str = r#"{
  "numStartups": 4,
  "mcpServers": {
    "fs": {
      "command": "python",
      "args": [
        "fs.py"
      ]
    },
    "git": {
      "type": "stdio",
      "command": "uvx",
      "args": [
        "mcp-server-git"
      ]
    }
  },
  "projects": {
    "/work": {
      "allowedTools": []
    }
  }
}
"#;

const CODEX_TOML: &str = r#"# Codex settings
model = "o3"

[mcp_servers.git]
command = "uvx"
args = ["mcp-server-git"]
startup_timeout_sec = 20

[profiles.fast]
model = "o4-mini"
"#;

fn source() -> Vec<ServerDefinition> {
    vec![
        ServerDefinition::stdio("fs", "node", ["a.js"]),
        ServerDefinition::remote("search", "https://search.example/mcp").with_env("Authorization", "Bearer x"),
    ]
}

/// Three installed targets sharing one fake home.
fn three_targets(fixture: &TestFixture) -> Vec<Target> {
    let claude = fixture.with_home_file(".claude.json", CLAUDE_JSON).unwrap();
    let gemini = fixture.with_home_file(".gemini/settings.json", "{\n  \"theme\": \"dark\"\n}\n").unwrap();
    let codex = fixture.with_home_file(".codex/config.toml", CODEX_TOML).unwrap();
    vec![
        Target::new(TargetKind::ClaudeCode, claude),
        Target::new(TargetKind::GeminiCli, gemini),
        Target::new(TargetKind::Codex, codex),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_apply_adds_and_resolves_without_dropping() {
        let fixture = TestFixture::new().unwrap();
        let registry = Registry::in_memory(source());
        let engine = SyncEngine::new(&registry, three_targets(&fixture));

        let preview = engine.preview("claude-code").unwrap();
        assert_eq!(preview.merge_result.added.len(), 1);
        assert_eq!(preview.merge_result.conflicts.len(), 1);
        assert!(preview.merge_result.kept.is_empty());

        let result = engine.apply_one("claude-code", None);
        assert!(result.success, "{}", result.message);
        assert_eq!(result.servers_written, 3);

        let written = fixture.read_home_file(".claude.json").unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["numStartups"], 4);
        assert_eq!(value["projects"]["/work"]["allowedTools"], serde_json::json!([]));
        assert_eq!(value["mcpServers"]["fs"]["command"], "node");
        assert_eq!(value["mcpServers"]["git"]["type"], "stdio");
        assert_eq!(value["mcpServers"]["search"]["headers"]["Authorization"], "Bearer x");

        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["numStartups", "mcpServers", "projects"]);
    }

    #[test]
    fn test_codex_target_keeps_unrelated_tables() {
        let fixture = TestFixture::new().unwrap();
        let registry = Registry::in_memory(source());
        let engine = SyncEngine::new(&registry, three_targets(&fixture));

        let result = engine.apply_one("codex", None);
        assert!(result.success, "{}", result.message);

        let written = fixture.read_home_file(".codex/config.toml").unwrap();
        assert!(written.starts_with("# Codex settings\nmodel = \"o3\"\n"));
        assert!(written.contains("startup_timeout_sec = 20"));
        assert!(written.contains("[profiles.fast]"));
        assert!(written.contains("[mcp_servers.fs]"));
        assert!(written.contains("[mcp_servers.search]"));

        let parsed: toml::Value = toml::from_str(&written).unwrap();
        assert_eq!(parsed["mcp_servers"]["fs"]["command"].as_str(), Some("node"));
        assert_eq!(parsed["mcp_servers"]["search"]["url"].as_str(), Some("https://search.example/mcp"));
        assert_eq!(parsed["profiles"]["fast"]["model"].as_str(), Some("o4-mini"));
    }

    #[test]
    fn test_apply_is_idempotent_for_every_target() {
        let fixture = TestFixture::new().unwrap();
        let registry = Registry::in_memory(source());
        let engine = SyncEngine::new(&registry, three_targets(&fixture));

        let first = engine.apply_all();
        assert!(first.iter().all(|r| r.success), "{first:?}");

        let snapshots: Vec<String> = [".claude.json", ".gemini/settings.json", ".codex/config.toml"]
            .iter()
            .map(|p| fixture.read_home_file(p).unwrap())
            .collect();

        let second = engine.apply_all();
        assert!(second.iter().all(|r| r.success && r.message.starts_with("Already in sync")), "{second:?}");

        for (path, before) in [".claude.json", ".gemini/settings.json", ".codex/config.toml"].iter().zip(&snapshots) {
            assert_eq!(&fixture.read_home_file(path).unwrap(), before, "{path} changed on second apply");
        }
        for (_, status) in engine.statuses() {
            assert_eq!(status, SyncStatus::Synced);
        }
    }

    #[test]
    fn test_target_only_server_survives_apply() {
        let fixture = TestFixture::new().unwrap();
        let path = fixture
            .with_home_file(
                ".factory/mcp.json",
                &standard_document("\"fs\": {\"command\": \"python\"}, \"git\": {\"command\": \"uvx\"}"),
            )
            .unwrap();
        let registry = Registry::in_memory(vec![stdio("fs", "node")]);
        let engine = SyncEngine::new(&registry, vec![Target::new(TargetKind::FactoryDroid, &path)]);

        let preview = engine.preview("factory-droid").unwrap();
        let names: Vec<&str> = preview
            .merge_result
            .added
            .iter()
            .chain(&preview.merge_result.kept)
            .map(|s| s.name.as_str())
            .chain(preview.merge_result.conflicts.iter().map(|c| c.name.as_str()))
            .collect();
        assert_eq!(names, vec!["fs"]);

        let content = engine.preview_content("factory-droid", None).unwrap();
        assert!(content.preview_content.contains("\"git\": {\"command\": \"uvx\"}"));

        assert!(engine.apply_one("factory-droid", None).success);
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["mcpServers"]["git"]["command"], "uvx");
        assert_eq!(value["mcpServers"]["fs"]["command"], "node");
    }

    #[test]
    fn test_apply_leaves_unrelated_bytes_untouched() {
        let fixture = TestFixture::new().unwrap();
        let original = "{\n  \"bigId\": 123456789012345678901234567890,\n  \"ratio\": 1.50,\n  \"mcpServers\": {\n    \"git\": {\"command\":\"uvx\"}\n  }\n}\n";
        let path = fixture.with_home_file(".claude.json", original).unwrap();
        let registry = Registry::in_memory(vec![stdio("git", "uvx"), stdio("fs", "node")]);
        let engine = SyncEngine::new(&registry, vec![Target::new(TargetKind::ClaudeCode, &path)]);

        let result = engine.apply_one("claude-code", None);
        assert!(result.success, "{}", result.message);

        let written = fs::read_to_string(&path).unwrap();
        let (head, _) = original.split_at(original.find("\n  }\n}").unwrap());
        assert!(written.starts_with(head), "{written}");
        assert!(written.ends_with("\"fs\": {\n      \"command\": \"node\"\n    }\n  }\n}\n"), "{written}");
    }

    #[test]
    fn test_preview_content_matches_apply() {
        let fixture = TestFixture::new().unwrap();
        let registry = Registry::in_memory(source());
        let engine = SyncEngine::new(&registry, three_targets(&fixture));

        let merge = engine.preview("claude-code").unwrap().merge_result;
        let keep = ConflictResolutions::from_choices(
            &merge,
            &HashMap::from([("fs".to_string(), ConflictChoice::Target)]),
        );
        let preview = engine.preview_content("claude-code", Some(&keep)).unwrap();
        assert_eq!(preview.current_content, CLAUDE_JSON);

        let result = engine.apply_one("claude-code", Some(&keep));
        assert!(result.success, "{}", result.message);
        assert_eq!(fixture.read_home_file(".claude.json").unwrap(), preview.preview_content);
        assert!(preview.preview_content.contains("\"command\": \"python\""));
    }

    #[test]
    fn test_default_resolution_equals_source_choice() {
        let fixture_a = TestFixture::new().unwrap();
        let fixture_b = TestFixture::new().unwrap();
        let registry = Registry::in_memory(source());

        let engine_a = SyncEngine::new(&registry, three_targets(&fixture_a));
        let engine_b = SyncEngine::new(&registry, three_targets(&fixture_b));

        let merge = engine_b.preview("claude-code").unwrap().merge_result;
        let all_source = ConflictResolutions::uniform(&merge, ConflictChoice::Source);

        assert!(engine_a.apply_one("claude-code", None).success);
        assert!(engine_b.apply_one("claude-code", Some(&all_source)).success);
        assert_eq!(
            fixture_a.read_home_file(".claude.json").unwrap(),
            fixture_b.read_home_file(".claude.json").unwrap()
        );
    }

    #[test]
    fn test_one_failing_target_does_not_affect_the_others() {
        let fixture = TestFixture::new().unwrap();
        let registry = Registry::in_memory(source());
        let mut targets = three_targets(&fixture);
        // Unparseable file in the middle of the list.
        let broken = fixture.with_home_file(".qwen/settings.json", "{ broken").unwrap();
        targets.insert(1, Target::new(TargetKind::QwenCode, broken));
        let engine = SyncEngine::new(&registry, targets);

        let results = engine.apply_all();
        let ids: Vec<&str> = results.iter().map(|r| r.tool_id.as_str()).collect();
        assert_eq!(ids, vec!["claude-code", "qwen-code", "gemini-cli", "codex"]);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[1].message.contains("failed to parse"));
        assert!(results[2].success && results[3].success);
        assert_eq!(fixture.read_home_file(".qwen/settings.json").unwrap(), "{ broken");
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_denied_is_reported_per_target() {
        use std::os::unix::fs::PermissionsExt;

        let fixture = TestFixture::new().unwrap();
        let registry = Registry::in_memory(source());
        let targets = three_targets(&fixture);
        let locked = targets[1].config_path().to_path_buf();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not apply to root.
        if fs::read_to_string(&locked).is_ok() {
            return;
        }

        let engine = SyncEngine::new(&registry, targets);
        let results = engine.apply_all();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].success, "{}", results[0].message);
        assert!(!results[1].success);
        assert!(results[1].message.contains("permission"), "{}", results[1].message);
        assert!(results[2].success, "{}", results[2].message);
    }

    #[test]
    fn test_disabled_and_missing_targets() {
        let fixture = TestFixture::new().unwrap();
        let registry = Registry::in_memory(source());
        let mut targets = three_targets(&fixture);
        targets[0] = targets[0].clone().with_enabled(false);
        targets.push(Target::new(TargetKind::OpenCode, fixture.home.join("missing/opencode/opencode.json")));
        let engine = SyncEngine::new(&registry, targets);

        let results = engine.apply_all();
        let ids: Vec<&str> = results.iter().map(|r| r.tool_id.as_str()).collect();
        assert_eq!(ids, vec!["gemini-cli", "codex", "opencode"]);
        assert_eq!(results[2].message, "OpenCode is not installed");
        assert_eq!(fixture.read_home_file(".claude.json").unwrap(), CLAUDE_JSON);
        assert_eq!(engine.preview_all().len(), 2);
    }

    #[test]
    fn test_changed_on_disk_between_read_and_write() {
        let fixture = TestFixture::new().unwrap();
        let path = fixture.with_home_file(".gemini/settings.json", "{}\n").unwrap();
        let target = Target::new(TargetKind::GeminiCli, &path);

        let snapshot = target.read().unwrap();
        fs::write(&path, "{\"theme\": \"light\"}\n").unwrap();

        let err = target.write(snapshot.raw_text.as_deref(), "{}\n", false).unwrap_err();
        assert!(err.to_string().contains("changed on disk"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"theme\": \"light\"}\n");
    }

    #[test]
    fn test_statuses_cover_every_target() {
        let fixture = TestFixture::new().unwrap();
        let registry = Registry::in_memory(source());
        let engine = SyncEngine::new(&registry, three_targets(&fixture));

        let statuses: Vec<(String, SyncStatus)> =
            engine.statuses().into_iter().map(|(t, s)| (t.tool_id, s)).collect();
        assert_eq!(
            statuses,
            vec![
                ("claude-code".to_string(), SyncStatus::Conflicted),
                ("gemini-cli".to_string(), SyncStatus::NoExistingSection),
                ("codex".to_string(), SyncStatus::OutOfSync),
            ]
        );
    }
}
