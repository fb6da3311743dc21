use crate::fixtures::TestFixture;
use mcpsync::app_config::{AppConfig, SourceMode};
use mcpsync::bootstrap::bootstrap_config;
use serial_test::serial;
use std::path::PathBuf;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let fixture = TestFixture::new().unwrap();
        let config = AppConfig::load_from(fixture.config.join("config.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let fixture = TestFixture::new().unwrap();
        fixture.with_app_config("source-mode = \"everywhere\"\n").unwrap();

        let err = AppConfig::load_from(fixture.config.join("config.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse TOML config"));
    }

    #[test]
    fn test_save_and_reload() {
        let fixture = TestFixture::new().unwrap();
        let path = fixture.path().join("nested").join("config.toml");

        let mut config = AppConfig { source_mode: SourceMode::ImportedReference, ..AppConfig::default() };
        config.set_target_enabled("codex", true, &[]);
        config.save_to(&path).unwrap();

        let reloaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
        assert_eq!(reloaded.enabled_targets, Some(vec!["codex".to_string()]));
    }

    #[test]
    fn test_save_keeps_comments_of_existing_file() {
        let fixture = TestFixture::new().unwrap();
        bootstrap_config(&fixture.config, false).unwrap();
        let path = fixture.config.join("config.toml");

        let mut config = AppConfig::load_from(&path).unwrap();
        config.source_mode = SourceMode::ImportedReference;
        config.reference_path = Some("~/.amp/settings.json".to_string());
        config.set_target_enabled("codex", true, &[]);
        config.save_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# mcpsync configuration file\n"), "{content}");
        assert!(content.contains("# Where the canonical server list comes from:"));
        assert!(content.contains("# Per-target config path overrides"));
        assert!(content.contains("source-mode = \"imported-reference\""));
        assert_eq!(AppConfig::load_from(&path).unwrap(), config);

        config.reference_path = None;
        config.save_to(&path).unwrap();
        let reloaded = AppConfig::load_from(&path).unwrap();
        assert!(reloaded.reference_path.is_none());
        assert_eq!(reloaded.enabled_targets, Some(vec!["codex".to_string()]));
        assert!(std::fs::read_to_string(&path).unwrap().contains("# Per-target config path overrides"));
    }

    #[test]
    #[serial]
    fn test_config_path_uses_xdg_config_home() {
        let fixture = TestFixture::new().unwrap();
        let original = std::env::var("XDG_CONFIG_HOME").ok();
        std::env::set_var("XDG_CONFIG_HOME", fixture.config_home());

        let path = AppConfig::config_path().unwrap();

        match original {
            Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
        assert_eq!(path, fixture.config_home().join("mcpsync").join("config.toml"));
        assert_eq!(path.parent().map(PathBuf::from), Some(fixture.config.clone()));
    }
}
