//! Live alert relay
//!
//! Every socket on `/ws` is a subscriber. A privileged client sends
//! `{"event":"send_alert","data":{...}}` and every connected client,
//! the sender included, receives `{"event":"alert","data":{...}}` with the
//! same payload. Alerts are never stored.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use alabanza_core::{AlertBroadcaster, AlertEvent, DeliveryReport};

use crate::http::extractors::{Access, Privileged};
use crate::http::server::AppState;

/// Frames a client may send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    SendAlert(AlertEvent),
}

/// Frames the server pushes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    Alert(AlertEvent),
}

/// Why an inbound frame was dropped
#[derive(Debug, thiserror::Error)]
pub enum InboundError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("send_alert requires the admin token")]
    NotPrivileged,
}

/// Act on one text frame from a client.
pub fn handle_frame(
    alerts: &AlertBroadcaster,
    privileged: bool,
    text: &str,
) -> Result<DeliveryReport, InboundError> {
    match serde_json::from_str::<ClientMessage>(text)? {
        ClientMessage::SendAlert(_) if !privileged => Err(InboundError::NotPrivileged),
        ClientMessage::SendAlert(event) => Ok(alerts.publish(&event)),
    }
}

/// GET /ws
async fn alert_socket(
    State(state): State<Arc<AppState>>,
    access: Access,
    ws: WebSocketUpgrade,
) -> Response {
    let alerts = state.alerts.clone();
    ws.on_upgrade(move |socket| relay(socket, alerts, access.privileged))
}

async fn relay(socket: WebSocket, alerts: AlertBroadcaster, privileged: bool) {
    let (mut sink, mut stream) = socket.split();
    let mut subscription = alerts.subscribe();
    let id = subscription.id;

    let mut outbound = tokio::spawn(async move {
        while let Some(event) = subscription.recv().await {
            let frame = match serde_json::to_string(&ServerMessage::Alert(event)) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(error = %e, "failed to encode alert");
                    continue;
                }
            };
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let publisher = alerts.clone();
    let mut inbound = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => {
                    if let Err(e) = handle_frame(&publisher, privileged, text.as_str()) {
                        tracing::debug!(subscriber = %id, error = %e, "ignored client frame");
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Either half ending means the client is gone
    tokio::select! {
        _ = &mut outbound => inbound.abort(),
        _ = &mut inbound => outbound.abort(),
    }
    alerts.unsubscribe(id);
}

/// POST /alerts - publish without holding a socket open
async fn publish_alert(
    State(state): State<Arc<AppState>>,
    _: Privileged,
    Json(event): Json<AlertEvent>,
) -> Json<DeliveryReport> {
    Json(state.alerts.publish(&event))
}

/// Alert routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws", get(alert_socket))
        .route("/alerts", post(publish_alert))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEND: &str =
        r#"{"event":"send_alert","data":{"type":"structure","message":"CORO","color":"blue"}}"#;

    #[test]
    fn parses_send_alert_envelope() {
        let msg: ClientMessage = serde_json::from_str(SEND).unwrap();
        assert_eq!(
            msg,
            ClientMessage::SendAlert(AlertEvent::new("structure", "CORO", "blue"))
        );
    }

    #[test]
    fn alert_envelope_echoes_payload() {
        let out = ServerMessage::Alert(AlertEvent::new("structure", "CORO", "blue"));
        assert_eq!(
            serde_json::to_value(out).unwrap(),
            serde_json::json!({
                "event": "alert",
                "data": {"type": "structure", "message": "CORO", "color": "blue"}
            })
        );
    }

    #[test]
    fn frame_reaches_sender_and_others() {
        let alerts = AlertBroadcaster::new();
        let mut director = alerts.subscribe();
        let mut screen = alerts.subscribe();

        let report = handle_frame(&alerts, true, SEND).unwrap();

        assert_eq!(report.delivered, 2);
        assert_eq!(director.try_recv().unwrap().message, "CORO");
        assert_eq!(screen.try_recv().unwrap().message, "CORO");
    }

    #[test]
    fn unprivileged_frame_is_dropped() {
        let alerts = AlertBroadcaster::new();
        let mut screen = alerts.subscribe();

        let err = handle_frame(&alerts, false, SEND).unwrap_err();

        assert!(matches!(err, InboundError::NotPrivileged));
        assert!(screen.try_recv().is_none());
    }

    #[test]
    fn unknown_event_is_malformed() {
        let alerts = AlertBroadcaster::new();
        let err = handle_frame(&alerts, true, r#"{"event":"dance","data":{}}"#).unwrap_err();
        assert!(matches!(err, InboundError::Malformed(_)));
    }
}
