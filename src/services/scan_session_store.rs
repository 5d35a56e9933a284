use actix::Recipient;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api_contract::scan_sessions::ScannedUrlFrame;
use crate::services::scan_session_ws::ScannedUrlNotice;

/// A scan session: URLs posted over HTTP, pushed to every subscribed socket.
#[derive(Clone)]
pub struct ScanSession {
    pub clients: HashMap<Uuid, Recipient<ScannedUrlNotice>>,
    pub scanned_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl ScanSession {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            clients: HashMap::new(),
            scanned_urls: Vec::new(),
            created_at: now,
            last_activity: now,
        }
    }
}

/// Thread-safe store for scan sessions with idle expiry.
#[derive(Clone)]
pub struct ScanSessionStore {
    sessions: Arc<DashMap<String, ScanSession>>,
    ttl: Duration,
    cleanup_interval: Duration,
}

impl ScanSessionStore {
    pub fn new(ttl: Duration, cleanup_interval: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl,
            cleanup_interval,
        }
    }

    pub fn create_session(&self) -> String {
        let session_id = generate_session_id();
        self.sessions.insert(session_id.clone(), ScanSession::new());
        info!(session_id = %session_id, "scan_session_created");
        session_id
    }

    /// Subscribe a socket. Returns false if the session does not exist.
    pub fn add_client(
        &self,
        session_id: &str,
        connection_id: Uuid,
        client: Recipient<ScannedUrlNotice>,
    ) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut session) => {
                session.clients.insert(connection_id, client);
                session.last_activity = Utc::now();
                info!(
                    session_id = %session_id,
                    connection_id = %connection_id,
                    subscribers = session.clients.len(),
                    "scan_session_client_added"
                );
                true
            }
            None => {
                warn!(
                    session_id = %session_id,
                    connection_id = %connection_id,
                    "scan_session_client_rejected_not_found"
                );
                false
            }
        }
    }

    /// Unsubscribe a socket; drops the session once it has no clients and no history.
    pub fn remove_client(&self, session_id: &str, connection_id: Uuid) {
        if let Some(mut session) = self.sessions.get_mut(session_id) {
            session.clients.remove(&connection_id);
            session.last_activity = Utc::now();
            debug!(
                session_id = %session_id,
                connection_id = %connection_id,
                subscribers = session.clients.len(),
                "scan_session_client_removed"
            );
        }

        let removed = self.sessions.remove_if(session_id, |_, session| {
            session.clients.is_empty() && session.scanned_urls.is_empty()
        });
        if removed.is_some() {
            info!(session_id = %session_id, "scan_session_removed_empty");
        }
    }

    /// Record `url` and push it to every subscriber. Returns false if the session does not exist.
    pub fn add_scanned_url(&self, session_id: &str, url: &str) -> bool {
        let clients: Vec<Recipient<ScannedUrlNotice>> = match self.sessions.get_mut(session_id) {
            Some(mut session) => {
                session.scanned_urls.push(url.to_string());
                session.last_activity = Utc::now();
                session.clients.values().cloned().collect()
            }
            None => {
                warn!(session_id = %session_id, "scan_session_url_rejected_not_found");
                return false;
            }
        };

        let frame = ScannedUrlFrame::new(url);
        let mut delivered = 0;
        for client in &clients {
            match client.try_send(ScannedUrlNotice { frame: frame.clone() }) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    debug!(session_id = %session_id, error = %e, "scan_session_push_failed");
                }
            }
        }

        info!(
            session_id = %session_id,
            subscribers = clients.len(),
            delivered = delivered,
            "scan_session_url_added"
        );
        true
    }

    pub fn scanned_urls(&self, session_id: &str) -> Option<Vec<String>> {
        self.sessions
            .get(session_id)
            .map(|session| session.scanned_urls.clone())
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drop sessions without subscribers whose last activity is older than the TTL.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let ttl = self.ttl;
        let mut expired_count = 0;

        self.sessions.retain(|session_id, session| {
            // An expiry past the representable range never arrives.
            let expired = session
                .last_activity
                .checked_add_signed(ttl)
                .is_some_and(|expires_at| expires_at < now);
            if session.clients.is_empty() && expired {
                info!(
                    session_id = %session_id,
                    created_at = %session.created_at,
                    scanned_urls = session.scanned_urls.len(),
                    "scan_session_expired_and_removed"
                );
                expired_count += 1;
                false
            } else {
                true
            }
        });

        expired_count
    }

    /// Start background cleanup task to remove expired sessions
    pub fn start_cleanup_task(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let period = self
                .cleanup_interval
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(60));
            let mut interval = tokio::time::interval(period);

            loop {
                interval.tick().await;

                let expired_count = self.evict_expired(Utc::now());
                if expired_count > 0 {
                    info!(
                        expired_count = expired_count,
                        active_sessions = self.sessions.len(),
                        "scan_session_cleanup_completed"
                    );
                }
            }
        })
    }
}

/// Generate a 32-character alphanumeric session ID
fn generate_session_id() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::rng();

    (0..32)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}
