use actix_web::{get, web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tracing::info;

use crate::api_contract::realtime_qr::InitiateSessionResponse;
use crate::config::AppSettings;
use crate::error::AppResult;
use crate::services::qr_link_ws::QrLinkWs;
use crate::services::qr_pairing_gateway::PairingGateway;
use crate::services::qr_session_registry::QrSessionRegistry;

/// Mint a session id and the mobile URL to show as a QR code
#[get("/initiate-session")]
pub async fn initiate_session(
    registry: web::Data<QrSessionRegistry>,
    settings: web::Data<AppSettings>,
) -> AppResult<HttpResponse> {
    let session_id = registry.create_session();
    let mobile_scan_url = settings.frontend.mobile_scan_url(&session_id)?;

    info!(
        session_id = %session_id,
        mobile_scan_url = %mobile_scan_url,
        "QR scan session initiated"
    );

    Ok(HttpResponse::Ok().json(InitiateSessionResponse {
        session_id,
        mobile_scan_url,
    }))
}

/// WebSocket endpoint shared by desktop and mobile pairing clients
#[get("/ws")]
pub async fn qr_link_ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    registry: web::Data<QrSessionRegistry>,
    settings: web::Data<AppSettings>,
) -> Result<HttpResponse, actix_web::Error> {
    let actor = QrLinkWs::new(
        PairingGateway::new(registry.clone()),
        settings.websocket.clone(),
    );

    info!(connection_id = %actor.connection_id, "Starting pairing WebSocket connection");

    ws::start(actor, &req, stream)
}
