use actix_web::{web, HttpResponse, Responder};
use serde::{Serialize, Deserialize};

use crate::services::qr_session_registry::QrSessionRegistry;
use crate::services::scan_session_store::ScanSessionStore;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: String,
    version: String,
    active_qr_sessions: usize,
    active_scan_sessions: usize,
}

pub async fn health_check(
    registry: web::Data<QrSessionRegistry>,
    scan_store: web::Data<ScanSessionStore>,
) -> impl Responder {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_qr_sessions: registry.active_session_count(),
        active_scan_sessions: scan_store.session_count(),
    };

    HttpResponse::Ok().json(response)
}
