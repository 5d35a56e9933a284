use actix_web::web;
use crate::handlers;

/// Configures the QR hand-off routes.
/// Mounted under the "/realtime-qr" scope in main.rs.
pub fn configure_realtime_qr_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(handlers::realtime_qr_handlers::initiate_session)
        .service(handlers::realtime_qr_handlers::qr_link_ws_handler);
}

/// Configures scan URL session routes.
/// Mounted under the "/session" scope in main.rs.
pub fn configure_scan_session_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(handlers::scan_session_handlers::create_scan_session)
        .service(handlers::scan_session_handlers::scan_url)
        .service(handlers::scan_session_handlers::get_scanned_urls)
        .service(handlers::scan_session_handlers::scan_session_ws_handler);
}

/// Builds the application's routes; shared by main.rs and the integration tests.
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/health")
            .route(web::get().to(handlers::health::health_check))
    )
    .service(
        web::scope("/realtime-qr")
            .configure(configure_realtime_qr_routes)
    )
    .service(
        web::scope("/session")
            .configure(configure_scan_session_routes)
    );
}
