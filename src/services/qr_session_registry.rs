use actix::Recipient;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::services::qr_link_ws::StudentQrData;

/// The desktop connection currently receiving scans for a session.
///
/// `peer` is a mailbox handle, not an owner: the WebSocket actor's lifetime is
/// managed by the transport.
#[derive(Clone)]
pub struct DesktopBinding {
    pub connection_id: Uuid,
    pub peer: Recipient<StudentQrData>,
    pub bound_at: DateTime<Utc>,
}

/// Authoritative map of live QR hand-off sessions.
///
/// Only this type mutates the map; the pairing gateway goes through its methods.
/// A session id minted by `create_session` is not stored until a desktop binds it.
#[derive(Clone, Default)]
pub struct QrSessionRegistry {
    bindings: Arc<DashMap<String, DesktopBinding>>,
}

impl QrSessionRegistry {
    pub fn new() -> Self {
        Self {
            bindings: Arc::new(DashMap::new()),
        }
    }

    /// Mint a fresh session id (UUID v4). Nothing is inserted.
    pub fn create_session(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        info!(session_id = %session_id, "qr_session_initiated");
        session_id
    }

    /// Bind `peer` as the desktop for `session_id`. An existing binding is replaced;
    /// returns the connection it belonged to when that was a different connection.
    pub fn register_desktop(
        &self,
        session_id: &str,
        connection_id: Uuid,
        peer: Recipient<StudentQrData>,
    ) -> Option<Uuid> {
        let binding = DesktopBinding {
            connection_id,
            peer,
            bound_at: Utc::now(),
        };

        let displaced = self
            .bindings
            .insert(session_id.to_string(), binding)
            .map(|previous| previous.connection_id)
            .filter(|previous| *previous != connection_id);

        if let Some(previous_connection_id) = displaced {
            warn!(
                session_id = %session_id,
                previous_connection_id = %previous_connection_id,
                connection_id = %connection_id,
                "qr_session_desktop_overwritten"
            );
        }

        info!(
            session_id = %session_id,
            connection_id = %connection_id,
            active_sessions = self.bindings.len(),
            "qr_session_desktop_registered"
        );

        displaced
    }

    /// Deliver `payload` to the bound desktop without waiting for it.
    ///
    /// Returns false when no desktop is bound. A bound desktop whose mailbox has
    /// already closed still counts as forwarded.
    pub fn forward_payload(&self, session_id: &str, payload: &str) -> bool {
        // Clone the handle out so the shard lock is not held while sending.
        let peer = match self.bindings.get(session_id) {
            Some(binding) => binding.peer.clone(),
            None => {
                warn!(session_id = %session_id, "qr_forward_no_desktop");
                return false;
            }
        };

        if let Err(e) = peer.try_send(StudentQrData {
            payload: payload.to_string(),
        }) {
            debug!(
                session_id = %session_id,
                error = %e,
                "qr_forward_delivery_failed"
            );
        }

        info!(
            session_id = %session_id,
            payload_len = payload.len(),
            "qr_forwarded_to_desktop"
        );
        true
    }

    /// Remove the binding for `session_id`, if any.
    pub fn cleanup_session(&self, session_id: &str) {
        if self.bindings.remove(session_id).is_some() {
            info!(session_id = %session_id, "qr_session_cleaned_up");
        }
    }

    /// Remove the binding only if it still belongs to `connection_id`.
    ///
    /// Used on disconnect so a closing desktop cannot evict a newer desktop that
    /// re-registered the same session id.
    pub fn release_desktop(&self, session_id: &str, connection_id: Uuid) -> bool {
        match self
            .bindings
            .remove_if(session_id, |_, binding| binding.connection_id == connection_id)
        {
            Some((_, binding)) => {
                info!(
                    session_id = %session_id,
                    connection_id = %connection_id,
                    bound_for_secs = (Utc::now() - binding.bound_at).num_seconds(),
                    "qr_session_released_on_disconnect"
                );
                true
            }
            None => {
                debug!(
                    session_id = %session_id,
                    connection_id = %connection_id,
                    "qr_session_release_skipped"
                );
                false
            }
        }
    }

    pub fn is_session_registered(&self, session_id: &str) -> bool {
        self.bindings.contains_key(session_id)
    }

    /// Connection id currently bound to `session_id`.
    pub fn bound_connection(&self, session_id: &str) -> Option<Uuid> {
        self.bindings.get(session_id).map(|b| b.connection_id)
    }

    pub fn active_session_count(&self) -> usize {
        self.bindings.len()
    }
}
