use crate::fixtures::{stdio, TestFixture};
use mcpsync::{
    app_config::{AppConfig, SourceMode},
    config::Config,
    registry::Registry,
    RegistryError,
};
use std::fs;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_self_managed_load_missing_document() {
        let fixture = TestFixture::new().unwrap();
        let config = Config::with_dir(&fixture.config);

        let registry = Registry::load(&config, &AppConfig::default()).unwrap();
        assert_eq!(registry.mode(), SourceMode::SelfManaged);
        assert!(registry.servers().is_empty());
        assert!(!registry.is_read_only());
    }

    #[test]
    fn test_self_managed_document_roundtrip() {
        let fixture = TestFixture::new().unwrap();
        fixture
            .with_registry(
                r#"{"mcpServers": {"fs": {"command": "node", "args": ["a.js"], "timeout": 30}}}"#,
            )
            .unwrap();
        let config = Config::with_dir(&fixture.config);

        let mut registry = Registry::load(&config, &AppConfig::default()).unwrap();
        registry.add_server(stdio("git", "uvx")).unwrap();

        let written = fs::read_to_string(fixture.registry_path()).unwrap();
        assert!(written.contains("\"timeout\": 30"), "unknown keys survive: {written}");
        assert!(written.ends_with("}\n"));

        let reloaded = Registry::load(&config, &AppConfig::default()).unwrap();
        let names: Vec<&str> = reloaded.servers().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["fs", "git"]);
    }

    #[test]
    fn test_imported_reference_mode() {
        let fixture = TestFixture::new().unwrap();
        let reference = fixture
            .with_home_file(
                ".config/amp/settings.json",
                r#"{"amp.mcpServers": {"search": {"url": "https://s.example/mcp"}}}"#,
            )
            .unwrap();
        let config = Config::with_dir(&fixture.config);
        let app_config = AppConfig {
            source_mode: SourceMode::ImportedReference,
            reference_path: Some(reference.display().to_string()),
            ..AppConfig::default()
        };

        let mut registry = Registry::load(&config, &app_config).unwrap();
        assert!(registry.is_read_only());
        assert_eq!(registry.path(), Some(reference.as_path()));
        assert_eq!(registry.servers()[0].url(), Some("https://s.example/mcp"));
        assert!(matches!(registry.add_server(stdio("x", "y")), Err(RegistryError::ReadOnly)));

        fs::write(&reference, r#"{"mcpServers": {"a": {"command": "b"}}}"#).unwrap();
        registry.refresh().unwrap();
        assert_eq!(registry.servers(), &[stdio("a", "b")]);
    }

    #[test]
    fn test_missing_reference_is_an_error() {
        let fixture = TestFixture::new().unwrap();
        let config = Config::with_dir(&fixture.config);
        let app_config = AppConfig {
            source_mode: SourceMode::ImportedReference,
            reference_path: Some(fixture.home.join("nope.json").display().to_string()),
            ..AppConfig::default()
        };

        let err = Registry::load(&config, &app_config).unwrap_err();
        assert!(matches!(err, RegistryError::Reference(_)));
    }

    #[test]
    fn test_malformed_document_is_parse_error() {
        let fixture = TestFixture::new().unwrap();
        fixture.with_registry(r#"{"mcpServers": []}"#).unwrap();
        let config = Config::with_dir(&fixture.config);

        assert!(matches!(
            Registry::load(&config, &AppConfig::default()),
            Err(RegistryError::Parse { .. })
        ));
    }
}
