//! LimbLink Control Server
//!
//! Owns the authoritative rig pose, validates console requests, and writes
//! accepted poses to the actuator bus. After every request the full pose is
//! broadcast to all connected consoles so each one renders the same rig.
//!
//! ## Protocol
//!
//! Messages are JSON with the following format:
//! ```json
//! { "type": "set_leg", "side": "left", "angle": 72.5 }
//! { "type": "set_joint", "side": "right", "angle": 30.0 }
//! { "type": "send_now" }
//! { "type": "get_status" }
//! ```
//!
//! The server answers with:
//! ```json
//! { "type": "state_update", "left_leg": { "angle": 72.5, "initial": 45.0 }, ... }
//! { "type": "error", "message": "Angle out of allowed range (45 +/- 60)" }
//! ```

mod controller;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc, time::Instant};
use tokio::sync::{broadcast, Mutex};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

use controller::{DryRunLink, PoseSnapshot, RobotController, Side};

/// Server configuration
const CHANNEL_CAPACITY: usize = 256;
const PORT: u16 = 5000;

/// A request from a console
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Move one leg to an absolute angle
    SetLeg { side: Side, angle: f64 },
    /// Move one joint relative to its leg
    SetJoint { side: Side, angle: f64 },
    /// Push the current pose to the actuator bus, skipping the throttle
    SendNow,
    /// Ask for the current pose
    GetStatus,
}

/// A message sent to consoles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The authoritative pose
    StateUpdate(PoseSnapshot),
    /// Request refused or malformed
    Error { message: String },
}

/// Shared application state
struct AppState {
    /// The one authoritative pose
    controller: Mutex<RobotController>,
    /// Pose fan-out to every connected console
    tx: broadcast::Sender<ServerMessage>,
}

impl AppState {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            controller: Mutex::new(RobotController::new(Box::new(DryRunLink))),
            tx,
        }
    }

    /// Push the current pose to every console.
    async fn broadcast_state(&self) {
        let snapshot = self.controller.lock().await.snapshot();
        let _ = self.tx.send(ServerMessage::StateUpdate(snapshot));
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "limblink_server=info,tower_http=info".into()),
        )
        .init();

    let state = Arc::new(AppState::new());

    let app = Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/api/status", get(api_status))
        .route("/api/health", get(api_health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], PORT));
    info!("LimbLink control server listening on {}", addr);
    info!("WebSocket endpoint: ws://localhost:{}/ws", PORT);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

/// Index page
async fn index() -> &'static str {
    "LimbLink control server - connect via WebSocket at /ws"
}

/// Current pose as plain JSON, for tooling that does not hold a socket open
async fn api_status(State(state): State<Arc<AppState>>) -> Json<PoseSnapshot> {
    Json(state.controller.lock().await.snapshot())
}

/// Health check
async fn api_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let actuator = if state.controller.lock().await.link_ready() {
        "hardware"
    } else {
        "dry_run"
    };
    Json(json!({
        "status": "ok",
        "actuator": actuator,
        "clients": state.tx.receiver_count(),
    }))
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a console's WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let conn_id = Uuid::new_v4().to_string();
    info!("New console: {}", conn_id);

    let (mut sender, mut receiver) = socket.split();
    // Subscribe before the hello so no broadcast slips between the two
    let mut rx = state.tx.subscribe();

    // A console gets the current pose the moment it connects
    let hello = ServerMessage::StateUpdate(state.controller.lock().await.snapshot());
    if sender
        .send(Message::Text(serde_json::to_string(&hello).unwrap().into()))
        .await
        .is_err()
    {
        info!("Console {} dropped before hello", conn_id);
        return;
    }

    loop {
        tokio::select! {
            // Requests from this console
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(request) => handle_request(&state, &conn_id, request).await,
                            Err(e) => {
                                warn!("Invalid message from {}: {}", conn_id, e);
                                Some(ServerMessage::Error {
                                    message: format!("Invalid message: {}", e),
                                })
                            }
                        };
                        if let Some(reply) = reply {
                            if sender.send(Message::Text(serde_json::to_string(&reply).unwrap().into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(_)) => {} // Ignore ping/pong and binary
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", conn_id, e);
                        break;
                    }
                }
            }

            // Pose broadcasts for every console
            update = rx.recv() => {
                match update {
                    Ok(server_msg) => {
                        let json = serde_json::to_string(&server_msg).unwrap();
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Missed snapshots; the next one carries the full pose
                        warn!("Console {} lagged, skipped {} updates", conn_id, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    info!("Console disconnected: {}", conn_id);
}

/// Apply one console request.
///
/// The return value is a direct reply for the requester alone; pose
/// broadcasts reach everyone through the channel, the requester included.
/// A refused move still triggers a broadcast so consoles that applied the
/// move optimistically snap back to the authoritative pose.
async fn handle_request(
    state: &Arc<AppState>,
    conn_id: &str,
    request: ClientMessage,
) -> Option<ServerMessage> {
    match request {
        ClientMessage::SetLeg { side, angle } => {
            let result = {
                let mut controller = state.controller.lock().await;
                let result = controller.set_leg(side, angle);
                if result.is_ok() {
                    controller.send_throttled(Instant::now());
                }
                result
            };
            state.broadcast_state().await;
            match result {
                Ok(()) => None,
                Err(message) => {
                    warn!("Refused leg angle {} from {}: {}", angle, conn_id, message);
                    Some(ServerMessage::Error { message })
                }
            }
        }
        ClientMessage::SetJoint { side, angle } => {
            let result = {
                let mut controller = state.controller.lock().await;
                let result = controller.set_joint(side, angle);
                if result.is_ok() {
                    controller.send_throttled(Instant::now());
                }
                result
            };
            state.broadcast_state().await;
            match result {
                Ok(()) => None,
                Err(message) => {
                    warn!("Refused joint angle {} from {}: {}", angle, conn_id, message);
                    Some(ServerMessage::Error { message })
                }
            }
        }
        ClientMessage::SendNow => {
            state.controller.lock().await.send_now();
            state.broadcast_state().await;
            None
        }
        ClientMessage::GetStatus => {
            let snapshot = state.controller.lock().await.snapshot();
            Some(ServerMessage::StateUpdate(snapshot))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_leg_request_parses() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "set_leg", "side": "left", "angle": 72.5}"#).unwrap();
        match msg {
            ClientMessage::SetLeg { side, angle } => {
                assert_eq!(side, Side::Left);
                assert!((angle - 72.5).abs() < f64::EPSILON);
            }
            other => panic!("parsed wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_bare_requests_parse() {
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type": "send_now"}"#).unwrap(),
            ClientMessage::SendNow
        ));
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type": "get_status"}"#).unwrap(),
            ClientMessage::GetStatus
        ));
    }

    #[test]
    fn test_state_update_inlines_pose_fields() {
        let controller = RobotController::new(Box::new(DryRunLink));
        let msg = ServerMessage::StateUpdate(controller.snapshot());
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "state_update");
        assert_eq!(value["left_leg"]["angle"], 45.0);
        assert_eq!(value["left_leg"]["initial"], 45.0);
        assert_eq!(value["right_joint"]["angle"], 0.0);
    }

    #[test]
    fn test_error_message_shape() {
        let msg = ServerMessage::Error {
            message: "Angle out of allowed range (45 +/- 60)".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"type":"error","message":"Angle out of allowed range (45 +/- 60)"}"#
        );
    }
}
