use config::{
    ConfigManager, ConfigSource, ExportFormat, FileSource, OverrideSource, SECRET_PLACEHOLDER,
    Settings,
};
use serial_test::serial;
use std::sync::Arc;

fn manager(sources: Vec<Arc<dyn ConfigSource>>) -> ConfigManager {
    ConfigManager::with_sources(sources)
}

#[test]
#[serial]
fn env_api_port_becomes_integer_with_everything_else_default() {
    unsafe {
        std::env::set_var("API_PORT", "8080");
    }
    let settings = ConfigManager::new().get_settings();
    unsafe {
        std::env::remove_var("API_PORT");
    }

    assert_eq!(settings.api.port, 8080);
    let tree = serde_json::to_value(settings.as_ref()).expect("settings serialize");
    assert!(tree["api"]["port"].is_u64(), "api.port must be an integer");

    let defaults = Settings::default();
    assert_eq!(settings.api.host, defaults.api.host);
    assert_eq!(settings.transformation, defaults.transformation);
    assert_eq!(settings.data, defaults.data);
}

#[test]
fn last_source_defining_a_leaf_wins() {
    let sequences: Vec<Vec<(&str, Option<u16>)>> = vec![
        vec![("a", Some(9001)), ("b", None), ("c", Some(9003))],
        vec![("a", Some(9001)), ("b", Some(9002)), ("c", None)],
        vec![("a", None), ("b", None), ("c", None)],
        vec![("a", Some(9001))],
    ];

    for sequence in sequences {
        let expected = sequence
            .iter()
            .filter_map(|(_, port)| *port)
            .last()
            .unwrap_or(Settings::default().api.port);

        let sources: Vec<Arc<dyn ConfigSource>> = sequence
            .iter()
            .map(|(name, port)| {
                let mut source = OverrideSource::new(*name).with("api.host", *name);
                if let Some(port) = port {
                    source.set("api.port", port.to_string());
                }
                Arc::new(source) as Arc<dyn ConfigSource>
            })
            .collect();

        let settings = manager(sources).get_settings();
        assert_eq!(settings.api.port, expected, "sequence {:?}", sequence);
        assert_eq!(
            settings.api.host,
            sequence.last().map(|(name, _)| *name).unwrap_or("0.0.0.0")
        );
    }
}

#[test]
fn yaml_json_and_unknown_files_merge_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let yaml = dir.path().join("base.yaml");
    let json = dir.path().join("local.json");
    let ini = dir.path().join("legacy.ini");
    std::fs::write(&yaml, "api:\n  port: 7000\n  workers: 8\nlogging:\n  level: DEBUG\n")
        .expect("write yaml");
    std::fs::write(&json, r#"{"api": {"port": "7001"}}"#).expect("write json");
    std::fs::write(&ini, "[api]\nport=1\n").expect("write ini");

    let settings = manager(vec![
        Arc::new(FileSource::new(&yaml)),
        Arc::new(FileSource::new(&ini)),
        Arc::new(FileSource::new(&json)),
        Arc::new(FileSource::new(dir.path().join("missing.yaml"))),
    ])
    .get_settings();

    assert_eq!(settings.api.port, 7001);
    assert_eq!(settings.api.workers, 8);
    assert_eq!(settings.logging.level, "DEBUG");
}

#[test]
fn rejected_merge_keeps_previous_snapshot() {
    let manager = manager(vec![Arc::new(
        OverrideSource::new("good").with("transformation.default_temperature", "0.4"),
    )]);
    let before = manager.get_settings();

    let result = manager.add_source(Arc::new(
        OverrideSource::new("bad").with("transformation.default_temperature", "7.5"),
    ));
    assert!(matches!(result, Err(config::ConfigError::Validation { .. })));
    assert_eq!(manager.get_settings(), before);
    assert_eq!(manager.get_settings().transformation.default_temperature, 0.4);
}

#[test]
fn export_replaces_credentials_in_every_format() {
    let dir = tempfile::tempdir().expect("tempdir");
    let manager = manager(vec![Arc::new(
        OverrideSource::new("keys")
            .with("llm.anthropic.api_key", "sk-real-key")
            .with("logging.elastic_password", "hunter2"),
    )]);
    assert_eq!(manager.get_settings().llm.anthropic.api_key, "sk-real-key");

    for (file, format) in [
        ("export.yaml", ExportFormat::Yaml),
        ("export.json", ExportFormat::Json),
    ] {
        let path = dir.path().join(file);
        manager.export(&path, format).expect("export");
        let written = std::fs::read_to_string(&path).expect("read export");
        assert!(!written.contains("sk-real-key"));
        assert!(!written.contains("hunter2"));

        let tree: serde_yaml::Value = serde_yaml::from_str(&written).expect("parse export");
        assert_eq!(
            tree["llm"]["anthropic"]["api_key"].as_str(),
            Some(SECRET_PLACEHOLDER)
        );
        assert_eq!(
            tree["embedding"]["models"]["qwen3-8b"]["max_tokens"].as_u64(),
            Some(32768)
        );
    }
}
