//! Bridges the local pose with the controller daemon.
//!
//! The bridge owns the connection status, queues outbound frames for
//! the transport to pick up, and digests inbound transport events. It
//! never touches a socket itself, which keeps every policy here
//! testable without one.

use crate::model::{Part, RobotState, Side};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::sync::{ChannelEvent, ConnectionState, ReconnectPolicy};

/// Where the channel stands and how many consecutive connect attempts
/// have failed. The counter resets on a successful connect or a manual
/// reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub attempts: u32,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
        }
    }
}

/// What the bridge reports after digesting one transport event.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Connected,
    Disconnected,
    ConnectFailed { attempts: u32 },
    /// The local pose was replaced by an authoritative snapshot
    StateUpdated,
    /// The controller refused a request
    RemoteError { message: String },
}

/// Reconciles local edits with the controller's authoritative state.
///
/// Outbound: every locally committed angle becomes a wire frame in the
/// outgoing queue. Inbound: snapshots replace the whole pose, no
/// merging, no clamping; the controller always wins, even against an
/// active drag.
pub struct SyncBridge {
    policy: ReconnectPolicy,
    status: ConnectionStatus,
    /// Frames waiting for the transport, drained once per frame
    outgoing: Vec<String>,
}

impl SyncBridge {
    pub fn new() -> Self {
        Self::with_policy(ReconnectPolicy::default())
    }

    pub fn with_policy(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            status: ConnectionStatus::default(),
            outgoing: Vec::new(),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn state(&self) -> ConnectionState {
        self.status.state
    }

    pub fn is_connected(&self) -> bool {
        self.status.state == ConnectionState::Connected
    }

    /// Note that a connect cycle just started. Call right after asking
    /// the transport to dial.
    pub fn on_connecting(&mut self) {
        self.status.state = ConnectionState::Connecting;
        self.status.attempts = 0;
    }

    /// Note that the operator closed the channel on purpose.
    pub fn on_manual_disconnect(&mut self) {
        self.status = ConnectionStatus::default();
    }

    /// Queue an angle request for one degree of freedom.
    pub fn queue_set_angle(&mut self, side: Side, part: Part, angle: f64) {
        self.queue(&ClientMessage::set_angle(side, part, angle));
    }

    /// Queue an immediate actuator flush.
    pub fn queue_send_now(&mut self) {
        self.queue(&ClientMessage::SendNow);
    }

    /// Queue a request for a full snapshot.
    pub fn queue_get_status(&mut self) {
        self.queue(&ClientMessage::GetStatus);
    }

    fn queue(&mut self, msg: &ClientMessage) {
        match serde_json::to_string(msg) {
            Ok(json) => self.outgoing.push(json),
            Err(e) => log::error!("Failed to encode outgoing frame: {}", e),
        }
    }

    /// Digest one transport event, applying snapshots to `state`.
    pub fn handle_event(
        &mut self,
        event: ChannelEvent,
        state: &mut RobotState,
    ) -> Option<SyncEvent> {
        match event {
            ChannelEvent::Connected => {
                self.status.state = ConnectionState::Connected;
                self.status.attempts = 0;
                // Resync against whatever the controller holds now
                self.queue_get_status();
                Some(SyncEvent::Connected)
            }
            ChannelEvent::Disconnected => {
                self.status.state = ConnectionState::Disconnected;
                Some(SyncEvent::Disconnected)
            }
            ChannelEvent::ConnectFailed(reason) => {
                self.status.attempts += 1;
                self.status.state = if self.policy.should_retry(self.status.attempts) {
                    ConnectionState::Connecting
                } else {
                    ConnectionState::Disconnected
                };
                log::warn!(
                    "Connect attempt {} failed: {}",
                    self.status.attempts,
                    reason
                );
                Some(SyncEvent::ConnectFailed {
                    attempts: self.status.attempts,
                })
            }
            ChannelEvent::Error(message) => {
                log::warn!("Control channel error: {}", message);
                None
            }
            ChannelEvent::Message(text) => self.handle_message(&text, state),
        }
    }

    fn handle_message(&mut self, text: &str, state: &mut RobotState) -> Option<SyncEvent> {
        let msg = match serde_json::from_str::<ServerMessage>(text) {
            Ok(msg) => msg,
            Err(e) => {
                log::warn!("Unparseable frame from controller: {}", e);
                return None;
            }
        };
        match msg {
            ServerMessage::StateUpdate {
                left_leg,
                left_joint,
                right_leg,
                right_joint,
            } => {
                // Snapshot replaces the whole pose verbatim. No clamp:
                // the controller's numbers are the truth.
                state.left_leg = left_leg.angle;
                state.left_joint = left_joint.angle;
                state.right_leg = right_leg.angle;
                state.right_joint = right_joint.angle;
                Some(SyncEvent::StateUpdated)
            }
            ServerMessage::Error { message } => Some(SyncEvent::RemoteError { message }),
        }
    }

    /// Take all queued outgoing frames, leaving the queue empty.
    pub fn take_outgoing(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }
}

impl Default for SyncBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_json(left_leg: f64, left_joint: f64, right_leg: f64, right_joint: f64) -> String {
        let state = RobotState {
            left_leg,
            left_joint,
            right_leg,
            right_joint,
        };
        serde_json::to_string(&ServerMessage::state_update(&state)).unwrap()
    }

    #[test]
    fn test_new_bridge_is_disconnected_and_quiet() {
        let bridge = SyncBridge::new();
        assert_eq!(bridge.state(), ConnectionState::Disconnected);
        assert_eq!(bridge.status().attempts, 0);
        assert!(!bridge.has_outgoing());
    }

    #[test]
    fn test_connected_requests_a_snapshot() {
        let mut bridge = SyncBridge::new();
        let mut state = RobotState::default();
        let event = bridge.handle_event(ChannelEvent::Connected, &mut state);
        assert_eq!(event, Some(SyncEvent::Connected));
        assert!(bridge.is_connected());

        let frames = bridge.take_outgoing();
        assert_eq!(frames.len(), 1);
        let parsed: ClientMessage = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(parsed, ClientMessage::GetStatus);
    }

    #[test]
    fn test_snapshot_overwrites_entire_pose() {
        let mut bridge = SyncBridge::new();
        let mut state = RobotState::default();
        state.left_joint = 30.0;

        let event = bridge.handle_event(
            ChannelEvent::Message(snapshot_json(60.0, 10.0, 90.0, 5.0)),
            &mut state,
        );
        assert_eq!(event, Some(SyncEvent::StateUpdated));
        assert!((state.left_leg - 60.0).abs() < f64::EPSILON);
        assert!((state.left_joint - 10.0).abs() < f64::EPSILON);
        assert!((state.right_leg - 90.0).abs() < f64::EPSILON);
        assert!((state.right_joint - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_snapshot_is_applied_without_clamping() {
        let mut bridge = SyncBridge::new();
        let mut state = RobotState::default();
        bridge.handle_event(
            ChannelEvent::Message(snapshot_json(120.0, -5.0, 45.0, 0.0)),
            &mut state,
        );
        assert!((state.left_leg - 120.0).abs() < f64::EPSILON);
        assert!((state.left_joint - -5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_remote_error_reports_without_touching_state() {
        let mut bridge = SyncBridge::new();
        let mut state = RobotState::default();
        let before = state;
        let event = bridge.handle_event(
            ChannelEvent::Message(r#"{"type":"error","message":"angle out of range"}"#.to_string()),
            &mut state,
        );
        assert_eq!(
            event,
            Some(SyncEvent::RemoteError {
                message: "angle out of range".to_string()
            })
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_garbage_frames_are_dropped() {
        let mut bridge = SyncBridge::new();
        let mut state = RobotState::default();
        let before = state;
        assert!(bridge
            .handle_event(ChannelEvent::Message("not json".to_string()), &mut state)
            .is_none());
        assert!(bridge
            .handle_event(
                ChannelEvent::Message(r#"{"type":"telemetry"}"#.to_string()),
                &mut state
            )
            .is_none());
        assert_eq!(state, before);
    }

    #[test]
    fn test_queue_set_angle_produces_wire_frames() {
        let mut bridge = SyncBridge::new();
        bridge.queue_set_angle(Side::Left, Part::Leg, 80.0);
        bridge.queue_set_angle(Side::Right, Part::Joint, 20.0);
        bridge.queue_send_now();

        let frames = bridge.take_outgoing();
        assert_eq!(frames.len(), 3);
        let first: ClientMessage = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(
            first,
            ClientMessage::SetLeg {
                side: Side::Left,
                angle: 80.0
            }
        );
        let second: ClientMessage = serde_json::from_str(&frames[1]).unwrap();
        assert_eq!(
            second,
            ClientMessage::SetJoint {
                side: Side::Right,
                angle: 20.0
            }
        );
        let third: ClientMessage = serde_json::from_str(&frames[2]).unwrap();
        assert_eq!(third, ClientMessage::SendNow);
        assert!(!bridge.has_outgoing());
    }

    #[test]
    fn test_connect_failures_count_up_then_go_idle() {
        let mut bridge = SyncBridge::new();
        let mut state = RobotState::default();
        bridge.on_connecting();
        assert_eq!(bridge.state(), ConnectionState::Connecting);

        for attempt in 1..=9 {
            let event = bridge.handle_event(
                ChannelEvent::ConnectFailed("refused".to_string()),
                &mut state,
            );
            assert_eq!(event, Some(SyncEvent::ConnectFailed { attempts: attempt }));
            assert_eq!(bridge.state(), ConnectionState::Connecting);
        }

        // The tenth failure exhausts the policy
        bridge.handle_event(
            ChannelEvent::ConnectFailed("refused".to_string()),
            &mut state,
        );
        assert_eq!(bridge.status().attempts, 10);
        assert_eq!(bridge.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_successful_connect_resets_the_attempt_counter() {
        let mut bridge = SyncBridge::new();
        let mut state = RobotState::default();
        bridge.on_connecting();
        for _ in 0..3 {
            bridge.handle_event(
                ChannelEvent::ConnectFailed("refused".to_string()),
                &mut state,
            );
        }
        assert_eq!(bridge.status().attempts, 3);

        bridge.handle_event(ChannelEvent::Connected, &mut state);
        assert_eq!(bridge.status().attempts, 0);
        assert!(bridge.is_connected());
    }

    #[test]
    fn test_manual_reconnect_starts_a_fresh_cycle() {
        let mut bridge = SyncBridge::new();
        let mut state = RobotState::default();
        for _ in 0..10 {
            bridge.handle_event(
                ChannelEvent::ConnectFailed("refused".to_string()),
                &mut state,
            );
        }
        assert_eq!(bridge.state(), ConnectionState::Disconnected);

        bridge.on_connecting();
        assert_eq!(bridge.state(), ConnectionState::Connecting);
        assert_eq!(bridge.status().attempts, 0);
    }
}
