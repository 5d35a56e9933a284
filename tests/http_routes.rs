use actix_web::{http::StatusCode, test, web, App};
use chrono::Duration;
use serde_json::{json, Value};

use student_notify_relay::config::settings::{
    AppConfig, AppSettings, FrontendConfig, ScanSessionConfig, ServerConfig, WebSocketConfig,
};
use student_notify_relay::routes::configure_app;
use student_notify_relay::services::qr_session_registry::QrSessionRegistry;
use student_notify_relay::services::scan_session_store::ScanSessionStore;

fn settings() -> AppSettings {
    AppSettings {
        app: AppConfig {
            name: "student-notify-relay".to_string(),
            environment: "test".to_string(),
            log_level: "info".to_string(),
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3001,
            cors_origins: vec!["*".to_string()],
        },
        frontend: FrontendConfig::default(),
        websocket: WebSocketConfig::default(),
        scan_session: ScanSessionConfig {
            ttl_secs: 600,
            cleanup_interval_secs: 60,
        },
    }
}

macro_rules! app {
    () => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(settings()))
                .app_data(web::Data::new(QrSessionRegistry::new()))
                .app_data(web::Data::new(ScanSessionStore::new(
                    Duration::minutes(10),
                    Duration::minutes(1),
                )))
                .configure(configure_app),
        )
        .await
    };
}

#[actix_web::test]
async fn health_is_public() {
    let app = app!();
    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "ok");
    assert_eq!(body["activeQrSessions"], 0);
}

#[actix_web::test]
async fn initiate_session_issues_distinct_ids() {
    let app = app!();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let req = test::TestRequest::get()
            .uri("/realtime-qr/initiate-session")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let session_id = body["sessionId"].as_str().unwrap().to_string();
        let url = body["mobileScanUrl"].as_str().unwrap();
        assert!(url.starts_with("http://localhost:3000/mobile-scan?sessionId="));
        assert!(url.ends_with(&session_id));
        ids.push(session_id);
    }

    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
}

#[actix_web::test]
async fn scan_session_round_trip() {
    let app = app!();

    let req = test::TestRequest::post().uri("/session").to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let session_id = created["sessionId"].as_str().unwrap();

    for url in ["https://example.com/a", "https://example.com/b"] {
        let req = test::TestRequest::post()
            .uri(&format!("/session/{}/scan", session_id))
            .set_json(json!({ "url": url }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let req = test::TestRequest::get()
        .uri(&format!("/session/{}/scanned-urls", session_id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["urls"], json!(["https://example.com/a", "https://example.com/b"]));
}

#[actix_web::test]
async fn scan_socket_for_unknown_session_is_not_found() {
    let app = app!();
    let req = test::TestRequest::get().uri("/session/missing/ws").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
