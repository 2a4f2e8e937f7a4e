use std::io::Write;
use tasker_result_cache::{CacheBackend, CacheSettings, SettingsLoader};
use tempfile::NamedTempFile;

fn settings_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_settings_from_toml_file() {
    let file = settings_file(
        r#"
backend = "memcache://10.0.0.1:11211;10.0.0.2:11211/"
expires_seconds = 3600

[backend_options]
max_entries = 250

[backend_options.behaviors]
read_timeout_ms = 500
"#,
    );

    let settings = SettingsLoader::new()
        .file(file.path())
        .required(true)
        .env_source(config::Map::new())
        .load()
        .unwrap();

    assert_eq!(
        settings.backend.as_deref(),
        Some("memcache://10.0.0.1:11211;10.0.0.2:11211/")
    );
    assert_eq!(settings.expires_seconds, 3600);
    assert_eq!(
        settings.backend_options.get("max_entries"),
        Some(&serde_json::json!(250))
    );
    assert_eq!(
        settings.backend_options["behaviors"]["read_timeout_ms"],
        serde_json::json!(500)
    );
}

#[test]
fn test_environment_overrides_file() {
    let file = settings_file("backend = \"memcache://a:11211/\"\nexpires_seconds = 60\n");

    let mut vars = config::Map::new();
    vars.insert("TASKER_CACHE_BACKEND".to_string(), "memory://".to_string());

    let settings = SettingsLoader::new()
        .file(file.path())
        .env_source(vars)
        .load()
        .unwrap();

    assert_eq!(settings.backend.as_deref(), Some("memory://"));
    assert_eq!(settings.expires_seconds, 60);
}

#[test]
fn test_invalid_backend_in_file_is_rejected() {
    let file = settings_file("backend = \"redis://localhost/\"\n");
    let err = SettingsLoader::new()
        .file(file.path())
        .env_source(config::Map::new())
        .load()
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_malformed_file_is_configuration_error() {
    let file = settings_file("expires_seconds = \"soon\"\n");
    let err = SettingsLoader::new()
        .file(file.path())
        .env_source(config::Map::new())
        .load()
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_loaded_settings_drive_backend_defaults() {
    let file = settings_file("backend = \"memory://\"\nexpires_seconds = 90\n");
    let settings = CacheSettings::load_from_file(file.path()).unwrap();

    let backend = CacheBackend::new(&settings, None, None, Default::default()).unwrap();
    assert_eq!(backend.scheme(), "memory");
    assert_eq!(backend.expires(), 90);
}
