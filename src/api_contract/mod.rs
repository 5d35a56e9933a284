pub mod realtime_qr;
pub mod scan_sessions;
