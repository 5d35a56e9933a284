use actix_web::{get, post, web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tracing::{debug, info};

use crate::api_contract::scan_sessions::{
    CreateScanSessionResponse, ScanUrlRequest, ScanUrlResponse, ScannedUrlsResponse,
};
use crate::config::AppSettings;
use crate::error::{AppError, AppResult};
use crate::services::scan_session_store::ScanSessionStore;
use crate::services::scan_session_ws::ScanSessionWs;

#[post("")]
pub async fn create_scan_session(
    store: web::Data<ScanSessionStore>,
) -> AppResult<HttpResponse> {
    let session_id = store.create_session();
    Ok(HttpResponse::Ok().json(CreateScanSessionResponse { session_id }))
}

#[post("/{session_id}/scan")]
pub async fn scan_url(
    path: web::Path<String>,
    body: web::Json<ScanUrlRequest>,
    store: web::Data<ScanSessionStore>,
) -> AppResult<HttpResponse> {
    let session_id = path.into_inner();
    let url = body
        .into_inner()
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::BadRequest("URL is required".to_string()))?;

    debug!(session_id = %session_id, url_len = url.len(), "Scanned URL submitted");

    if !store.add_scanned_url(&session_id, &url) {
        return Err(AppError::NotFound(format!("Session {} not found", session_id)));
    }

    Ok(HttpResponse::Ok().json(ScanUrlResponse { success: true }))
}

#[get("/{session_id}/scanned-urls")]
pub async fn get_scanned_urls(
    path: web::Path<String>,
    store: web::Data<ScanSessionStore>,
) -> AppResult<HttpResponse> {
    let session_id = path.into_inner();
    let urls = store
        .scanned_urls(&session_id)
        .ok_or_else(|| AppError::NotFound(format!("Session {} not found", session_id)))?;

    Ok(HttpResponse::Ok().json(ScannedUrlsResponse { urls }))
}

/// Subscribe to scanned URLs of an existing session
#[get("/{session_id}/ws")]
pub async fn scan_session_ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<String>,
    store: web::Data<ScanSessionStore>,
    settings: web::Data<AppSettings>,
) -> Result<HttpResponse, actix_web::Error> {
    let session_id = path.into_inner();
    if !store.contains(&session_id) {
        return Err(AppError::NotFound(format!("Session {} not found", session_id)).into());
    }

    info!(session_id = %session_id, "Starting scan subscriber WebSocket");

    let actor = ScanSessionWs::new(session_id, store.clone(), settings.websocket.clone());
    ws::start(actor, &req, stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};
    use chrono::Duration;
    use serde_json::json;

    fn store() -> web::Data<ScanSessionStore> {
        web::Data::new(ScanSessionStore::new(Duration::minutes(10), Duration::minutes(1)))
    }

    macro_rules! app {
        ($store:expr) => {
            test::init_service(
                App::new().app_data($store.clone()).service(
                    web::scope("/session")
                        .service(create_scan_session)
                        .service(scan_url)
                        .service(get_scanned_urls),
                ),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_scan_flow() {
        let store = store();
        let app = app!(store);

        let req = test::TestRequest::post().uri("/session").to_request();
        let created: CreateScanSessionResponse = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri(&format!("/session/{}/scan", created.session_id))
            .set_json(json!({"url": "https://example.com/student/20210001"}))
            .to_request();
        let scanned: ScanUrlResponse = test::call_and_read_body_json(&app, req).await;
        assert!(scanned.success);

        let req = test::TestRequest::get()
            .uri(&format!("/session/{}/scanned-urls", created.session_id))
            .to_request();
        let urls: ScannedUrlsResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(urls.urls, vec!["https://example.com/student/20210001".to_string()]);
    }

    #[actix_web::test]
    async fn test_scan_requires_url() {
        let store = store();
        let session_id = store.create_session();
        let app = app!(store);

        let req = test::TestRequest::post()
            .uri(&format!("/session/{}/scan", session_id))
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_unknown_session_is_not_found() {
        let store = store();
        let app = app!(store);

        let req = test::TestRequest::post()
            .uri("/session/missing/scan")
            .set_json(json!({"url": "https://example.com"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri("/session/missing/scanned-urls")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
