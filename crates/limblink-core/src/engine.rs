//! Single-threaded engine loop.
//!
//! Every input source feeds one queue: pointer gestures, slider edits,
//! and transport events all become [`EngineEvent`]s, processed strictly
//! in arrival order, each one run to completion before the next. That
//! makes interleavings like "snapshot lands mid-drag" deterministic
//! instead of racy.

use std::collections::VecDeque;

use kurbo::Point;

use crate::bridge::{ConnectionStatus, SyncBridge, SyncEvent};
use crate::drag::DragController;
use crate::hit::HANDLE_HIT_RADIUS;
use crate::model::{Part, RigConfig, RobotState, Side};
use crate::sync::ChannelEvent;

/// One unit of input for the engine. Pointer positions are in world
/// coordinates; the caller applies its camera transform first.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp,
    /// A slider committed an angle in the part's own frame
    SliderInput { side: Side, part: Part, angle: f64 },
    /// Flush angles to the actuators right now
    SendNow,
    /// Anything the transport produced
    Channel(ChannelEvent),
}

/// Owns the pose and everything that may change it.
pub struct Engine {
    state: RobotState,
    rig: RigConfig,
    drag: DragController,
    bridge: SyncBridge,
    queue: VecDeque<EngineEvent>,
    /// World-space grab tolerance, kept in sync with the camera zoom
    hit_tolerance: f64,
    needs_redraw: bool,
    notices: Vec<String>,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_rig(RigConfig::default())
    }

    pub fn with_rig(rig: RigConfig) -> Self {
        Self {
            state: RobotState::default(),
            rig,
            drag: DragController::new(),
            bridge: SyncBridge::new(),
            queue: VecDeque::new(),
            hit_tolerance: HANDLE_HIT_RADIUS,
            needs_redraw: true,
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> &RobotState {
        &self.state
    }

    pub fn rig(&self) -> &RigConfig {
        &self.rig
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.bridge.status()
    }

    pub fn bridge(&self) -> &SyncBridge {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut SyncBridge {
        &mut self.bridge
    }

    /// Grab tolerance in world units. The screen-space grab radius is
    /// constant, so callers divide it by their zoom.
    pub fn set_hit_tolerance(&mut self, tolerance: f64) {
        self.hit_tolerance = tolerance;
    }

    /// Queue one event for the next pump.
    pub fn push(&mut self, event: EngineEvent) {
        self.queue.push_back(event);
    }

    /// Process everything queued so far, in order.
    pub fn pump(&mut self) {
        while let Some(event) = self.queue.pop_front() {
            self.process(event);
        }
    }

    /// True once since the last time it was taken.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    /// Operator-facing messages produced since the last take.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    fn process(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::PointerDown(point) => {
                if self
                    .drag
                    .begin(&self.state, &self.rig, point, self.hit_tolerance)
                {
                    // Affordance rings hide while a drag is active
                    self.needs_redraw = true;
                }
            }
            EngineEvent::PointerMove(point) => {
                if let Some(commit) = self.drag.update(&mut self.state, point) {
                    self.bridge
                        .queue_set_angle(commit.side, commit.part, commit.angle);
                    self.needs_redraw = true;
                }
            }
            EngineEvent::PointerUp => {
                if self.drag.end() {
                    self.needs_redraw = true;
                }
            }
            EngineEvent::SliderInput { side, part, angle } => {
                if let Some(committed) = self.state.apply_local_angle(side, part, angle) {
                    self.bridge.queue_set_angle(side, part, committed);
                    self.needs_redraw = true;
                }
            }
            EngineEvent::SendNow => {
                self.bridge.queue_send_now();
            }
            EngineEvent::Channel(event) => {
                match self.bridge.handle_event(event, &mut self.state) {
                    Some(SyncEvent::StateUpdated) => {
                        self.needs_redraw = true;
                    }
                    Some(SyncEvent::RemoteError { message }) => {
                        log::warn!("Controller refused a request: {}", message);
                        self.notices.push(message);
                    }
                    Some(SyncEvent::Connected) => {
                        log::info!("Control channel connected");
                        self.needs_redraw = true;
                    }
                    Some(SyncEvent::Disconnected) => {
                        log::info!("Control channel disconnected");
                        self.needs_redraw = true;
                    }
                    Some(SyncEvent::ConnectFailed { attempts }) => {
                        log::debug!("Connect attempt {} failed", attempts);
                        self.needs_redraw = true;
                    }
                    None => {}
                }
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::limb_geometry;
    use crate::protocol::{ClientMessage, ServerMessage};

    fn at_angle(center: Point, degrees: f64, radius: f64) -> Point {
        let rad = degrees.to_radians();
        Point::new(center.x + radius * rad.cos(), center.y + radius * rad.sin())
    }

    fn snapshot_json(left_leg: f64, left_joint: f64, right_leg: f64, right_joint: f64) -> String {
        let state = RobotState {
            left_leg,
            left_joint,
            right_leg,
            right_joint,
        };
        serde_json::to_string(&ServerMessage::state_update(&state)).unwrap()
    }

    fn outgoing_frames(engine: &mut Engine) -> Vec<ClientMessage> {
        engine
            .bridge_mut()
            .take_outgoing()
            .iter()
            .map(|json| serde_json::from_str(json).unwrap())
            .collect()
    }

    #[test]
    fn test_pointer_drag_runs_end_to_end() {
        let mut engine = Engine::new();
        let pivot = engine.rig().pivot(Side::Left);

        engine.push(EngineEvent::PointerDown(pivot));
        engine.push(EngineEvent::PointerMove(at_angle(pivot, 80.0, 200.0)));
        engine.push(EngineEvent::PointerUp);
        engine.pump();

        assert!((engine.state().left_leg - 80.0).abs() < 1e-9);
        assert!(!engine.is_dragging());
        assert!(engine.take_redraw());

        let frames = outgoing_frames(&mut engine);
        assert_eq!(frames.len(), 1);
        match &frames[0] {
            ClientMessage::SetLeg { side, angle } => {
                assert_eq!(*side, Side::Left);
                assert!((angle - 80.0).abs() < 1e-9);
            }
            other => panic!("expected set_leg, got {:?}", other),
        }
    }

    #[test]
    fn test_joint_drag_commits_relative_angle() {
        let mut engine = Engine::new();
        let knee = limb_geometry(engine.state(), Side::Left, engine.rig()).knee;

        engine.push(EngineEvent::PointerDown(knee));
        engine.push(EngineEvent::PointerMove(at_angle(knee, 80.0, 150.0)));
        engine.pump();

        // Leg sits at its 45 degree start, so absolute 80 is 35 relative
        assert!((engine.state().left_joint - 35.0).abs() < 1e-9);
        let frames = outgoing_frames(&mut engine);
        match &frames[0] {
            ClientMessage::SetJoint { side, angle } => {
                assert_eq!(*side, Side::Left);
                assert!((angle - 35.0).abs() < 1e-9);
            }
            other => panic!("expected set_joint, got {:?}", other),
        }
    }

    #[test]
    fn test_pointer_miss_changes_nothing() {
        let mut engine = Engine::new();
        let before = *engine.state();
        engine.take_redraw();

        engine.push(EngineEvent::PointerDown(Point::new(9000.0, 9000.0)));
        engine.push(EngineEvent::PointerMove(Point::new(9100.0, 9100.0)));
        engine.push(EngineEvent::PointerUp);
        engine.pump();

        assert_eq!(*engine.state(), before);
        assert!(!engine.take_redraw());
        assert!(!engine.bridge().has_outgoing());
    }

    #[test]
    fn test_slider_input_clamps_and_queues() {
        let mut engine = Engine::new();
        engine.push(EngineEvent::SliderInput {
            side: Side::Right,
            part: Part::Leg,
            angle: 200.0,
        });
        engine.pump();

        assert!((engine.state().right_leg - 105.0).abs() < f64::EPSILON);
        let frames = outgoing_frames(&mut engine);
        assert_eq!(
            frames,
            vec![ClientMessage::SetLeg {
                side: Side::Right,
                angle: 105.0
            }]
        );
    }

    #[test]
    fn test_send_now_queues_a_flush() {
        let mut engine = Engine::new();
        engine.push(EngineEvent::SendNow);
        engine.pump();
        assert_eq!(outgoing_frames(&mut engine), vec![ClientMessage::SendNow]);
    }

    #[test]
    fn test_remote_snapshot_wins_mid_drag() {
        let mut engine = Engine::new();
        let pivot = engine.rig().pivot(Side::Left);
        engine.push(EngineEvent::PointerDown(pivot));
        engine.pump();
        assert!(engine.is_dragging());

        engine.push(EngineEvent::Channel(ChannelEvent::Message(snapshot_json(
            60.0, 10.0, 90.0, 5.0,
        ))));
        engine.pump();

        // The snapshot replaced the whole pose without ending the drag
        assert!(engine.is_dragging());
        assert!((engine.state().left_leg - 60.0).abs() < f64::EPSILON);
        assert!((engine.state().left_joint - 10.0).abs() < f64::EPSILON);
        assert!((engine.state().right_leg - 90.0).abs() < f64::EPSILON);
        assert!((engine.state().right_joint - 5.0).abs() < f64::EPSILON);

        // The live drag keeps going from the overwritten pose
        engine.push(EngineEvent::PointerMove(at_angle(pivot, 90.0, 200.0)));
        engine.pump();
        assert!((engine.state().left_leg - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_connected_channel_event_resyncs() {
        let mut engine = Engine::new();
        engine.push(EngineEvent::Channel(ChannelEvent::Connected));
        engine.pump();

        assert!(engine.bridge().is_connected());
        assert_eq!(outgoing_frames(&mut engine), vec![ClientMessage::GetStatus]);
    }

    #[test]
    fn test_remote_error_becomes_a_notice() {
        let mut engine = Engine::new();
        engine.push(EngineEvent::Channel(ChannelEvent::Message(
            r#"{"type":"error","message":"left_leg angle 130 out of range"}"#.to_string(),
        )));
        engine.pump();

        assert_eq!(
            engine.take_notices(),
            vec!["left_leg angle 130 out of range".to_string()]
        );
        assert!(engine.take_notices().is_empty());
    }

    #[test]
    fn test_events_process_in_arrival_order() {
        let mut engine = Engine::new();

        // Snapshot first, slider second: the slider value survives
        engine.push(EngineEvent::Channel(ChannelEvent::Message(snapshot_json(
            60.0, 0.0, 45.0, 0.0,
        ))));
        engine.push(EngineEvent::SliderInput {
            side: Side::Left,
            part: Part::Leg,
            angle: 70.0,
        });
        engine.pump();
        assert!((engine.state().left_leg - 70.0).abs() < f64::EPSILON);

        // Slider first, snapshot second: the snapshot wins
        engine.push(EngineEvent::SliderInput {
            side: Side::Left,
            part: Part::Leg,
            angle: 95.0,
        });
        engine.push(EngineEvent::Channel(ChannelEvent::Message(snapshot_json(
            50.0, 0.0, 45.0, 0.0,
        ))));
        engine.pump();
        assert!((engine.state().left_leg - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_redraw_flag_is_one_shot() {
        let mut engine = Engine::new();
        assert!(engine.take_redraw());
        assert!(!engine.take_redraw());

        engine.push(EngineEvent::SliderInput {
            side: Side::Left,
            part: Part::Joint,
            angle: 10.0,
        });
        engine.pump();
        assert!(engine.take_redraw());
        assert!(!engine.take_redraw());
    }

    #[test]
    fn test_shrunken_tolerance_rejects_loose_grabs() {
        let mut engine = Engine::new();
        let pivot = engine.rig().pivot(Side::Left);
        let near = Point::new(pivot.x + 10.0, pivot.y);

        engine.set_hit_tolerance(4.0);
        engine.push(EngineEvent::PointerDown(near));
        engine.pump();
        assert!(!engine.is_dragging());

        engine.set_hit_tolerance(HANDLE_HIT_RADIUS);
        engine.push(EngineEvent::PointerDown(near));
        engine.pump();
        assert!(engine.is_dragging());
    }
}
