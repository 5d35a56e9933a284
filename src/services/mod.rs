pub mod qr_session_registry;
pub mod qr_pairing_gateway;
pub mod qr_link_ws;
pub mod scan_session_store;
pub mod scan_session_ws;
