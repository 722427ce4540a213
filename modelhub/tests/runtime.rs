use errors::AdapterError;
use modelhub::{Runtime, RuntimeError, RuntimeOptions};
use mr_core::{Backend, BackendHandle, BackendSpec, ProviderAdapter, ProviderKind, Purpose};
use registry::RegistryError;
use serde_json::{Map, json};
use serial_test::serial;
use std::any::Any;
use std::sync::Arc;

struct StubBackend(BackendSpec);

impl Backend for StubBackend {
    fn spec(&self) -> &BackendSpec {
        &self.0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct StubAdapter(ProviderKind);

impl ProviderAdapter for StubAdapter {
    fn provider_type(&self) -> ProviderKind {
        self.0
    }

    fn build(&self, spec: BackendSpec) -> Result<BackendHandle, AdapterError> {
        Ok(Arc::new(StubBackend(spec)))
    }

    fn health_check(&self) -> bool {
        true
    }
}

fn options(dir: &tempfile::TempDir) -> RuntimeOptions {
    RuntimeOptions::new().with_registry_dir(dir.path().join("registry"))
}

#[test]
#[serial]
fn test_bootstrap_seeds_enabled_providers() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Runtime::bootstrap(
        options(&dir)
            .with_override("llm.local.enabled", true)
            .with_override("llm.local.additional_settings.base_url", "http://localhost:11434"),
    )
    .unwrap();

    let local = runtime.registry().get("local-deepseek-chat").unwrap();
    assert_eq!(local.default_config["base_url"], json!("http://localhost:11434"));
    assert!(local.serves(&Purpose::transformer()));
    assert!(runtime.registry().get("openai-gpt-4").is_some());
    assert!(runtime.registry().get("azure_openai-gpt-4").is_none());
}

#[test]
#[serial]
fn test_seeding_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Runtime::bootstrap(options(&dir).with_seeding(false)).unwrap();
    assert!(runtime.registry().list().is_empty());
}

#[test]
#[serial]
fn test_env_file_and_config_file_layering() {
    let dir = tempfile::tempdir().unwrap();
    let env_path = dir.path().join(".env");
    std::fs::write(&env_path, "API_PORT=9123\nAPI_WORKERS=2\n").unwrap();
    let yaml_path = dir.path().join("config.yaml");
    std::fs::write(&yaml_path, "api:\n  workers: 6\napp_name: Layered\n").unwrap();

    let runtime = Runtime::bootstrap(
        options(&dir)
            .with_env_file(&env_path, true)
            .with_config_file(&yaml_path)
            .with_override("app_name", "Overridden")
            .with_seeding(false),
    )
    .unwrap();

    let settings = runtime.settings();
    assert_eq!(settings.api.port, 9123);
    assert_eq!(settings.api.workers, 6);
    assert_eq!(settings.app_name, "Overridden");
}

#[test]
#[serial]
fn test_set_secret_is_sealed_on_disk_and_visible_in_settings() {
    let dir = tempfile::tempdir().unwrap();
    let env_path = dir.path().join(".env");
    unsafe {
        std::env::remove_var("OPENAI_API_KEY");
    }
    let runtime = Runtime::bootstrap(
        options(&dir)
            .with_env_file(&env_path, true)
            .with_seeding(false),
    )
    .unwrap();

    let settings = runtime
        .set_secret("OPENAI_API_KEY", "sk-live-123", true, true)
        .unwrap();
    assert_eq!(settings.llm.openai.api_key, "sk-live-123");

    let on_disk = std::fs::read_to_string(&env_path).unwrap();
    assert!(on_disk.contains("OPENAI_API_KEY=encrypted:"));
    assert!(!on_disk.contains("sk-live-123"));

    let export = dir.path().join("export.yaml");
    runtime
        .config()
        .export(&export, config::ExportFormat::Yaml)
        .unwrap();
    assert!(!std::fs::read_to_string(&export).unwrap().contains("sk-live-123"));
}

#[test]
#[serial]
fn test_resolver_uses_registered_adapters() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Runtime::bootstrap(
        options(&dir).with_adapter(Arc::new(StubAdapter(ProviderKind::Gemini))),
    )
    .unwrap();
    let resolver = runtime.resolver();

    let transformer = resolver
        .resolve_for_purpose(Purpose::TRANSFORMER, &Map::new())
        .unwrap();
    assert_eq!(transformer.spec().provider, ProviderKind::Gemini);

    let missing_adapter = resolver
        .resolve_by_id("openai-gpt-4", &Map::new())
        .err()
        .unwrap();
    assert!(matches!(
        missing_adapter,
        RegistryError::ProviderNotRegistered { .. }
    ));

    let preferred = resolver
        .resolve_preferring(Purpose::GENERAL, ProviderKind::Gemini, &Map::new())
        .unwrap();
    assert_eq!(preferred.spec().model_id, "gemini-models/gemini-2.5-flash");

    assert!(matches!(
        resolver.resolve(None, None, &Map::new()).err(),
        Some(RegistryError::MissingTarget)
    ));
}

#[test]
#[serial]
fn test_unwritable_registry_dir_fails_bootstrap() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("registry");
    std::fs::write(&blocker, "not a directory").unwrap();

    let err = Runtime::bootstrap(options(&dir)).unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Registry(RegistryError::Persistence { .. })
    ));
}
