pub mod health;
pub mod realtime_qr_handlers;
pub mod scan_session_handlers;
