use actix::Recipient;
use actix_web::web;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api_contract::realtime_qr::{InboundEvent, OutboundEvent};
use crate::services::qr_link_ws::StudentQrData;
use crate::services::qr_session_registry::QrSessionRegistry;

/// Role of a pairing connection.
///
/// Mobile scanners never register, so they stay `Unbound` while submitting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionRole {
    #[default]
    Unbound,
    DesktopBound { session_id: String },
}

/// Translates inbound pairing messages into registry calls and registry
/// results into events for the calling connection.
#[derive(Clone)]
pub struct PairingGateway {
    registry: web::Data<QrSessionRegistry>,
}

impl PairingGateway {
    pub fn new(registry: web::Data<QrSessionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &QrSessionRegistry {
        &self.registry
    }

    /// Handle one inbound message to completion. The returned events go back to
    /// the sender only; forwarded scans reach the desktop through the registry.
    pub fn dispatch(
        &self,
        role: &mut ConnectionRole,
        connection_id: Uuid,
        self_peer: &Recipient<StudentQrData>,
        event: InboundEvent,
    ) -> Vec<OutboundEvent> {
        match event {
            InboundEvent::RegisterDesktop(payload) => {
                self.register_desktop(role, connection_id, self_peer, payload.session_id)
            }
            InboundEvent::SendStudentQrData(payload) => {
                self.send_student_qr_data(role, connection_id, &payload.session_id, &payload.qr_data)
            }
            InboundEvent::Ping => vec![OutboundEvent::Pong],
            InboundEvent::Pong => {
                debug!(connection_id = %connection_id, "qr_ws_client_pong");
                Vec::new()
            }
        }
    }

    fn register_desktop(
        &self,
        role: &mut ConnectionRole,
        connection_id: Uuid,
        self_peer: &Recipient<StudentQrData>,
        session_id: String,
    ) -> Vec<OutboundEvent> {
        info!(
            connection_id = %connection_id,
            session_id = %session_id,
            "qr_register_desktop_requested"
        );

        if let ConnectionRole::DesktopBound { session_id: previous } = role {
            if *previous != session_id {
                self.registry.release_desktop(previous, connection_id);
            }
        }

        self.registry
            .register_desktop(&session_id, connection_id, self_peer.clone());
        let ack = OutboundEvent::desktop_registered(&session_id);
        *role = ConnectionRole::DesktopBound { session_id };

        vec![ack]
    }

    fn send_student_qr_data(
        &self,
        role: &ConnectionRole,
        connection_id: Uuid,
        session_id: &str,
        qr_data: &str,
    ) -> Vec<OutboundEvent> {
        if let ConnectionRole::DesktopBound { session_id: bound } = role {
            warn!(
                connection_id = %connection_id,
                bound_session_id = %bound,
                session_id = %session_id,
                "qr_submit_rejected_from_desktop"
            );
            return vec![OutboundEvent::data_forward_failed(
                "Desktop connections cannot submit scan data.",
            )];
        }

        info!(
            connection_id = %connection_id,
            session_id = %session_id,
            qr_data_len = qr_data.len(),
            "qr_submit_received"
        );

        if self.registry.forward_payload(session_id, qr_data) {
            vec![OutboundEvent::data_forwarded()]
        } else {
            vec![OutboundEvent::data_forward_failed(format!(
                "Session {} not found or desktop client disconnected.",
                session_id
            ))]
        }
    }

    /// Closed transition: a bound desktop gives up its session.
    pub fn disconnect(&self, role: &ConnectionRole, connection_id: Uuid) {
        match role {
            ConnectionRole::DesktopBound { session_id } => {
                self.registry.release_desktop(session_id, connection_id);
            }
            ConnectionRole::Unbound => {
                debug!(connection_id = %connection_id, "qr_unbound_connection_closed");
            }
        }
    }
}
