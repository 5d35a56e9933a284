use actix_web::{web, App, HttpServer, middleware::Logger};
use actix_cors::Cors;
use dotenv::dotenv;
use std::net::TcpListener;

use student_notify_relay::config;
use student_notify_relay::logging::init_logging;
use student_notify_relay::routes::configure_app;
use student_notify_relay::services::qr_session_registry::QrSessionRegistry;
use student_notify_relay::services::scan_session_store::ScanSessionStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Load application settings
    let app_settings = match config::init_config() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load application settings: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&app_settings.app.log_level) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    log::info!(
        "Starting {} ({})",
        app_settings.app.name,
        app_settings.app.environment
    );

    // Session state lives for the lifetime of the process
    let qr_registry = web::Data::new(QrSessionRegistry::new());

    let (scan_ttl, scan_cleanup_interval) = match (
        app_settings.scan_session.ttl(),
        app_settings.scan_session.cleanup_interval(),
    ) {
        (Ok(ttl), Ok(interval)) => (ttl, interval),
        (Err(e), _) | (_, Err(e)) => {
            log::error!("Invalid scan session settings: {}", e);
            std::process::exit(1);
        }
    };
    let scan_store = ScanSessionStore::new(scan_ttl, scan_cleanup_interval);
    let _cleanup_handle = scan_store.clone().start_cleanup_task();
    let scan_store = web::Data::new(scan_store);

    let host = &app_settings.server.host;
    let port = app_settings.server.port;

    log::info!("Starting server at http://{}:{}", host, port);
    log::info!(
        "Mobile scan page: {}{}",
        app_settings.frontend.base_url,
        app_settings.frontend.mobile_scan_path
    );

    let server_addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(server_addr)?;

    let settings_data = web::Data::new(app_settings.clone());

    HttpServer::new(move || {
        // Configure CORS using actix-cors
        let mut cors = Cors::default()
            .supports_credentials();

        if app_settings.server.cors_origins.contains(&"*".to_string()) {
            cors = Cors::permissive();
        } else {
            for origin in &app_settings.server.cors_origins {
                cors = cors.allowed_origin(origin);
            }
            cors = cors
                .allowed_methods(vec!["GET", "HEAD", "PUT", "PATCH", "POST", "DELETE", "OPTIONS"])
                .allow_any_header();
        }

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(settings_data.clone())
            .app_data(qr_registry.clone())
            .app_data(scan_store.clone())
            .configure(configure_app)
    })
    .listen(listener)?
    .run()
    .await
}
