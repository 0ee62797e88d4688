//! Unit tests for configuration module

use gen_studio_client::config::{Settings, BackendConfig, DEFAULT_WS_URL};
use std::io::Write;
use std::time::Duration;
use tempfile::{Builder, TempDir};

#[test]
fn test_default_settings() {
    let settings = Settings::default();

    assert_eq!(settings.backend.ws_url, DEFAULT_WS_URL);
    assert_eq!(settings.backend.health_path, "/health");
    assert_eq!(settings.backend.connect_timeout(), Duration::from_secs(10));
    assert_eq!(settings.backend.ready_timeout(), Duration::from_millis(2000));
    assert_eq!(settings.defaults.width, 512);
    assert_eq!(settings.defaults.height, 768);
    assert_eq!(settings.defaults.steps, 24);
    assert_eq!(settings.defaults.guidance, 7.0);
    assert_eq!(settings.defaults.seed, "123456");
    assert_eq!(settings.defaults.strength, 0.55);
    assert_eq!(settings.output.dir, "./generated");
    assert_eq!(settings.logging.format, "pretty");
}

#[test]
fn test_settings_validation_valid() {
    let mut settings = Settings::default();
    settings.backend.ws_url = "wss://studio.example.com/ws/generate".to_string();
    assert!(settings.validate().is_ok());
}

#[test]
fn test_settings_validation_invalid_url() {
    let mut settings = Settings::default();
    settings.backend.ws_url = "not a url".to_string();
    assert!(settings.validate().is_err());

    settings.backend.ws_url = "https://localhost:8000/ws/generate".to_string();
    assert!(settings.validate().is_err());
}

#[test]
fn test_settings_validation_zero_timeout() {
    let mut settings = Settings::default();
    settings.backend.connect_timeout_secs = 0;
    assert!(settings.validate().is_err());
}

#[test]
fn test_settings_validation_default_ranges() {
    let mut settings = Settings::default();
    settings.defaults.steps = 100;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.defaults.guidance = 20.0;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.defaults.strength = 1.5;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.defaults.width = 128;
    assert!(settings.validate().is_err());
}

#[test]
fn test_settings_validation_output_and_logging() {
    let mut settings = Settings::default();
    settings.output.dir = "  ".to_string();
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.logging.format = "xml".to_string();
    assert!(settings.validate().is_err());
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let settings = Settings::load_from_path(dir.path().join("absent.toml")).unwrap();
    assert_eq!(settings.defaults.steps, 24);
    assert_eq!(settings.defaults.seed, "123456");
}

#[test]
fn test_load_toml_file() {
    let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[backend]
ws_url = "ws://gpu-box:9000/ws/generate"
ready_timeout_ms = 500

[defaults]
steps = 30
seed = ""
negative = "blurry"

[output]
dir = "/tmp/renders"
"#
    )
    .unwrap();

    let settings = Settings::load_from_path(file.path()).unwrap();
    assert_eq!(settings.backend.ws_url, "ws://gpu-box:9000/ws/generate");
    assert_eq!(settings.backend.ready_timeout(), Duration::from_millis(500));
    assert_eq!(settings.defaults.steps, 30);
    assert_eq!(settings.defaults.seed, "");
    assert_eq!(settings.defaults.negative, "blurry");
    assert_eq!(settings.defaults.width, 512);
    assert_eq!(settings.output.dir, "/tmp/renders");
}

#[test]
fn test_load_yaml_file() {
    let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        "backend:\n  ws_url: wss://studio.example.com/ws/generate\ndefaults:\n  width: 768\n  guidance: 9.5\n"
    )
    .unwrap();

    let settings = Settings::load_from_path(file.path()).unwrap();
    assert_eq!(settings.backend.ws_url, "wss://studio.example.com/ws/generate");
    assert_eq!(settings.defaults.width, 768);
    assert_eq!(settings.defaults.guidance, 9.5);
}

#[test]
fn test_load_rejects_invalid_file() {
    let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[backend]\nws_url = \"http://localhost:8000\"").unwrap();
    assert!(Settings::load_from_path(file.path()).is_err());
}

#[test]
fn test_environment_override() {
    let dir = TempDir::new().unwrap();
    std::env::set_var("GEN_STUDIO__LOGGING__LEVEL", "debug");
    let settings = Settings::load_from_path(dir.path().join("absent.toml"));
    std::env::remove_var("GEN_STUDIO__LOGGING__LEVEL");

    assert_eq!(settings.unwrap().logging.level, "debug");
}

#[test]
fn test_health_url_derivation() {
    let backend = BackendConfig {
        ws_url: "ws://10.0.0.5:8000/ws/generate".to_string(),
        ..Default::default()
    };
    assert_eq!(backend.health_url().unwrap(), "http://10.0.0.5:8000/health");
}
