//! Health probe integration tests

use gen_studio_client::config::BackendConfig;
use gen_studio_client::health::HealthProbe;
use gen_studio_client::AppError;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> BackendConfig {
    BackendConfig {
        http_url: Some(server.uri()),
        health_timeout_secs: 2,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_health_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "device": "cuda",
            "using": "/models/sd15",
            "local_dir": "/models/sd15",
            "local_has_model_index": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let probe = HealthProbe::new(&config_for(&server)).unwrap();
    assert_eq!(probe.url(), format!("{}/health", server.uri()));

    let report = probe.check().await.unwrap();
    assert!(report.ok);
    assert_eq!(report.device.as_deref(), Some("cuda"));
    assert_eq!(report.using.as_deref(), Some("/models/sd15"));
    assert_eq!(report.local_has_model_index, Some(true));
}

#[tokio::test]
async fn test_health_not_ok_still_parses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": false})))
        .mount(&server)
        .await;

    let report = HealthProbe::new(&config_for(&server))
        .unwrap()
        .check()
        .await
        .unwrap();
    assert!(!report.ok);
    assert!(report.device.is_none());
}

#[tokio::test]
async fn test_health_custom_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let config = BackendConfig {
        health_path: "/status".to_string(),
        ..config_for(&server)
    };
    assert!(HealthProbe::new(&config).unwrap().check().await.unwrap().ok);
}

#[tokio::test]
async fn test_health_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(500).set_body_string("pipeline not loaded"))
        .mount(&server)
        .await;

    let result = HealthProbe::new(&config_for(&server)).unwrap().check().await;
    match result {
        Err(AppError::Backend(message)) => {
            assert!(message.contains("500"));
            assert!(message.contains("pipeline not loaded"));
        }
        other => panic!("expected a backend error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_health_invalid_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>hi</html>"))
        .mount(&server)
        .await;

    let result = HealthProbe::new(&config_for(&server)).unwrap().check().await;
    assert!(matches!(result, Err(AppError::Backend(_))));
}

#[tokio::test]
async fn test_health_unreachable() {
    let config = BackendConfig {
        http_url: Some("http://127.0.0.1:9".to_string()),
        health_timeout_secs: 2,
        ..Default::default()
    };
    let result = HealthProbe::new(&config).unwrap().check().await;
    assert!(matches!(result, Err(AppError::HttpClient(_))));
}
