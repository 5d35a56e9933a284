// The server only relays: scanned data is never stored, and a session lives
// exactly as long as the desktop connection that registered it.

use actix::prelude::*;
use actix_web_actors::{ws, ws::Message, ws::CloseCode, ws::CloseReason};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api_contract::realtime_qr::{InboundEvent, OutboundEvent};
use crate::config::settings::WebSocketConfig;
use crate::services::qr_pairing_gateway::{ConnectionRole, PairingGateway};

/// Inbound text frames a connection may send: `burst` at once, `per_sec` sustained.
pub(crate) struct FrameBudget {
    available: f64,
    burst: f64,
    per_sec: f64,
    checked_at: Instant,
}

impl FrameBudget {
    pub(crate) fn new(burst: u32, per_sec: u32) -> Self {
        Self {
            available: f64::from(burst),
            burst: f64::from(burst),
            per_sec: f64::from(per_sec),
            checked_at: Instant::now(),
        }
    }

    pub(crate) fn try_take(&mut self) -> bool {
        self.try_take_at(Instant::now())
    }

    fn try_take_at(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.checked_at).as_secs_f64();
        self.available = (self.available + elapsed * self.per_sec).min(self.burst);
        self.checked_at = now;

        if self.available >= 1.0 {
            self.available -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Scanned text forwarded to a registered desktop connection.
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct StudentQrData {
    pub payload: String,
}

/// WebSocket actor for one pairing connection (desktop or mobile).
pub struct QrLinkWs {
    pub connection_id: Uuid,
    pub role: ConnectionRole,
    pub last_heartbeat: Instant,
    gateway: PairingGateway,
    config: WebSocketConfig,
    budget: FrameBudget,
}

impl QrLinkWs {
    pub fn new(gateway: PairingGateway, config: WebSocketConfig) -> Self {
        let budget = FrameBudget::new(config.rate_limit_capacity, config.rate_limit_refill_per_sec);
        Self {
            connection_id: Uuid::new_v4(),
            role: ConnectionRole::Unbound,
            last_heartbeat: Instant::now(),
            gateway,
            config,
            budget,
        }
    }

    /// Start heartbeat process for this connection
    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let client_timeout = self.config.client_timeout();
        ctx.run_interval(self.config.heartbeat_interval(), move |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > client_timeout {
                warn!(
                    connection_id = %act.connection_id,
                    role = ?act.role,
                    "WebSocket client heartbeat failed, disconnecting"
                );
                ctx.stop();
                return;
            }

            ctx.ping(b"heartbeat");
        });
    }

    fn emit(&self, event: &OutboundEvent, ctx: &mut ws::WebsocketContext<Self>) {
        match serde_json::to_string(event) {
            Ok(frame) => {
                debug!(
                    connection_id = %self.connection_id,
                    event = event.event_name(),
                    "qr_ws_emit"
                );
                ctx.text(frame);
            }
            Err(err) => {
                error!(
                    connection_id = %self.connection_id,
                    event = event.event_name(),
                    %err,
                    "qr_ws_serialize_failed"
                );
            }
        }
    }

    fn handle_message(&mut self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        let event = match InboundEvent::parse(text) {
            Ok(event) => event,
            Err(err) => {
                warn!(
                    connection_id = %self.connection_id,
                    code = err.code(),
                    error = %err,
                    "qr_ws_invalid_message"
                );
                self.emit(&OutboundEvent::from(&err), ctx);
                return;
            }
        };

        let self_peer = ctx.address().recipient();
        let replies = self
            .gateway
            .dispatch(&mut self.role, self.connection_id, &self_peer, event);

        for reply in &replies {
            self.emit(reply, ctx);
        }
    }
}

impl Actor for QrLinkWs {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(
            connection_id = %self.connection_id,
            "Pairing WebSocket connection started"
        );
        self.start_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!(
            connection_id = %self.connection_id,
            role = ?self.role,
            "Pairing WebSocket connection stopped"
        );
        self.gateway.disconnect(&self.role, self.connection_id);
    }
}

impl Handler<StudentQrData> for QrLinkWs {
    type Result = ();

    fn handle(&mut self, msg: StudentQrData, ctx: &mut Self::Context) {
        debug!(
            connection_id = %self.connection_id,
            payload_len = msg.payload.len(),
            "Delivering scanned data to desktop"
        );
        self.emit(&OutboundEvent::StudentQrData(msg.payload), ctx);
    }
}

impl StreamHandler<Result<Message, ws::ProtocolError>> for QrLinkWs {
    fn handle(&mut self, msg: Result<Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(Message::Ping(msg)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(Message::Text(text)) => {
                self.last_heartbeat = Instant::now();

                if !self.budget.try_take() {
                    warn!(
                        connection_id = %self.connection_id,
                        role = ?self.role,
                        "Rate limit exceeded; closing WebSocket"
                    );
                    ctx.close(Some(CloseReason {
                        code: CloseCode::Policy,
                        description: Some("rate limit exceeded".into()),
                    }));
                    ctx.stop();
                    return;
                }

                self.handle_message(&text, ctx);
            }
            Ok(Message::Binary(_)) => {
                self.last_heartbeat = Instant::now();
                self.emit(
                    &OutboundEvent::error("unsupported_frame", "Binary frames are not supported"),
                    ctx,
                );
            }
            Ok(Message::Close(reason)) => {
                info!(
                    connection_id = %self.connection_id,
                    reason = ?reason,
                    "WebSocket close message received"
                );
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_budget_exhausts_after_burst() {
        let mut budget = FrameBudget::new(3, 1);
        let now = budget.checked_at;
        assert!(budget.try_take_at(now));
        assert!(budget.try_take_at(now));
        assert!(budget.try_take_at(now));
        assert!(!budget.try_take_at(now));
    }

    #[test]
    fn test_budget_refills_partial_seconds() {
        let mut budget = FrameBudget::new(2, 4);
        let start = budget.checked_at;
        assert!(budget.try_take_at(start));
        assert!(budget.try_take_at(start));
        assert!(!budget.try_take_at(start));

        let later = start + Duration::from_millis(500);
        assert!(budget.try_take_at(later));
        assert!(budget.try_take_at(later));
        assert!(!budget.try_take_at(later));
    }

    #[test]
    fn test_budget_never_exceeds_burst() {
        let mut budget = FrameBudget::new(2, 100);
        let later = budget.checked_at + Duration::from_secs(60);
        assert!(budget.try_take_at(later));
        assert!(budget.try_take_at(later));
        assert!(!budget.try_take_at(later));
    }
}
