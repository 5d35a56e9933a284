use actix::prelude::*;
use actix_web::web;
use actix_web_actors::{ws, ws::Message};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api_contract::scan_sessions::ScannedUrlFrame;
use crate::config::settings::WebSocketConfig;
use crate::services::scan_session_store::ScanSessionStore;

/// A scanned URL pushed to a subscriber socket.
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct ScannedUrlNotice {
    pub frame: ScannedUrlFrame,
}

/// Listen-only WebSocket subscribed to one scan session.
pub struct ScanSessionWs {
    pub connection_id: Uuid,
    pub session_id: String,
    pub last_heartbeat: Instant,
    store: web::Data<ScanSessionStore>,
    config: WebSocketConfig,
}

impl ScanSessionWs {
    pub fn new(session_id: String, store: web::Data<ScanSessionStore>, config: WebSocketConfig) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            session_id,
            last_heartbeat: Instant::now(),
            store,
            config,
        }
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let client_timeout = self.config.client_timeout();
        ctx.run_interval(self.config.heartbeat_interval(), move |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > client_timeout {
                warn!(
                    connection_id = %act.connection_id,
                    session_id = %act.session_id,
                    "Scan subscriber heartbeat failed, disconnecting"
                );
                ctx.stop();
                return;
            }

            ctx.ping(b"heartbeat");
        });
    }
}

impl Actor for ScanSessionWs {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let recipient = ctx.address().recipient();
        if !self.store.add_client(&self.session_id, self.connection_id, recipient) {
            // Session expired between the HTTP check and the upgrade.
            ctx.close(Some(ws::CloseReason {
                code: ws::CloseCode::Policy,
                description: Some("session not found".into()),
            }));
            ctx.stop();
            return;
        }

        info!(
            connection_id = %self.connection_id,
            session_id = %self.session_id,
            "Scan subscriber connected"
        );
        self.start_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!(
            connection_id = %self.connection_id,
            session_id = %self.session_id,
            "Scan subscriber disconnected"
        );
        self.store.remove_client(&self.session_id, self.connection_id);
    }
}

impl Handler<ScannedUrlNotice> for ScanSessionWs {
    type Result = ();

    fn handle(&mut self, msg: ScannedUrlNotice, ctx: &mut Self::Context) {
        match serde_json::to_string(&msg.frame) {
            Ok(text) => ctx.text(text),
            Err(err) => error!(
                connection_id = %self.connection_id,
                %err,
                "Failed to serialize scanned-url frame"
            ),
        }
    }
}

impl StreamHandler<Result<Message, ws::ProtocolError>> for ScanSessionWs {
    fn handle(&mut self, msg: Result<Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(Message::Ping(msg)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(Message::Text(_)) | Ok(Message::Binary(_)) => {
                self.last_heartbeat = Instant::now();
                debug!(
                    connection_id = %self.connection_id,
                    "Ignoring inbound frame on listen-only scan socket"
                );
            }
            Ok(Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                error!(
                    connection_id = %self.connection_id,
                    error = %e,
                    "WebSocket protocol error"
                );
                ctx.stop();
            }
            _ => {}
        }
    }
}
