use std::sync::Arc;
use ploston_entitlements::{CapabilitiesSnapshot, EntitlementState, EnterpriseCapabilities, PluginHost};
use ploston_license::{LicenseConfig, LicenseMode};
use ploston_server::{bootstrap, build_router, HealthResponse};

fn ungated_config() -> LicenseConfig {
    LicenseConfig {
        mode: LicenseMode::Disabled,
        ..LicenseConfig::default()
    }
}

/// Spin up the HTTP server on an OS-assigned port, returning the base URL.
async fn spawn_test_server(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn capabilities_endpoint_returns_snapshot() {
    let boot = bootstrap(&ungated_config()).unwrap();
    boot.plugins().start_all().unwrap();
    let base = spawn_test_server(build_router(boot.capabilities("3.1.0"))).await;

    let resp = reqwest::get(format!("{}/api/v1/capabilities", base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: CapabilitiesSnapshot = resp.json().await.unwrap();
    assert_eq!(body.tier, "enterprise");
    assert_eq!(body.version, "3.1.0");
    assert!(body.features.policy);
    assert!(body.features.plugins.contains("synthesis"));
    assert_eq!(body.limits.max_concurrent_executions, Some(100));
    assert!(body.license.is_none());
}

#[tokio::test]
async fn capabilities_endpoint_serializes_unbounded_limits_as_null() {
    let boot = bootstrap(&ungated_config()).unwrap();
    let base = spawn_test_server(build_router(boot.capabilities("3.1.0"))).await;

    let body: serde_json::Value = reqwest::get(format!("{}/api/v1/capabilities", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(body["limits"]["max_workflows"].is_null());
    assert!(body["license"].is_null());
    assert_eq!(body["features"]["plugins"], serde_json::json!([]));
}

#[tokio::test]
async fn capabilities_reflect_plugins_stopped_after_startup() {
    let state = Arc::new(EntitlementState::licenseless());
    let host = Arc::new(PluginHost::assemble(&state.flags()));
    host.start_all().unwrap();
    let provider = Arc::new(EnterpriseCapabilities::new(state, host.clone(), "3.1.0"));
    let base = spawn_test_server(build_router(provider)).await;

    let url = format!("{}/api/v1/capabilities", base);
    let before: CapabilitiesSnapshot = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert!(before.features.plugins.contains("policy"));

    host.shutdown_all();
    let after: CapabilitiesSnapshot = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert!(after.features.plugins.is_empty());
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let boot = bootstrap(&ungated_config()).unwrap();
    let base = spawn_test_server(build_router(boot.capabilities("3.1.0"))).await;

    let resp = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(resp.status(), 200);

    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.contains("application/json"));

    let body: HealthResponse = resp.json().await.unwrap();
    assert_eq!(body.status, "ok");
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let boot = bootstrap(&ungated_config()).unwrap();
    let base = spawn_test_server(build_router(boot.capabilities("3.1.0"))).await;

    let resp = reqwest::get(format!("{}/api/v1/nonexistent", base))
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
}
