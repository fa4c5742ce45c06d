//! Drag gesture state machine for the rig's grab points.

use kurbo::Point;

use crate::hit::{hit_test, DragTarget};
use crate::model::{Part, RigConfig, RobotState};

/// One angle committed to the local pose by a gesture or slider,
/// already clamped, ready to go out on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleCommit {
    pub side: crate::model::Side,
    pub part: Part,
    pub angle: f64,
}

/// Tracks the single active drag, if any.
///
/// At most one grab point can be dragged at a time. The controller is
/// either idle or holding the [`DragTarget`] captured on pointer-down;
/// pointer-down while already dragging is ignored.
#[derive(Debug, Default)]
pub struct DragController {
    target: Option<DragTarget>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.target.is_some()
    }

    pub fn target(&self) -> Option<DragTarget> {
        self.target
    }

    /// Pointer-down: hit-test and latch onto a grab point.
    ///
    /// Returns whether a drag started. A second pointer-down while a
    /// drag is active leaves the current gesture untouched.
    pub fn begin(
        &mut self,
        state: &RobotState,
        rig: &RigConfig,
        point: Point,
        tolerance: f64,
    ) -> bool {
        if self.target.is_some() {
            return false;
        }
        self.target = hit_test(state, rig, point, tolerance);
        self.target.is_some()
    }

    /// Pointer-move: recompute the dragged angle and commit it.
    ///
    /// The pointer's bearing from the captured reference center gives an
    /// absolute angle. Legs take it as-is; joints subtract the same
    /// side's leg angle as it is right now, so a leg moved under an
    /// active joint drag (by a remote update) changes what the next
    /// move commits. Returns `None` while idle or when the angle is
    /// rejected as non-finite.
    pub fn update(&mut self, state: &mut RobotState, point: Point) -> Option<AngleCommit> {
        let target = self.target?;
        let dx = point.x - target.reference.x;
        let dy = point.y - target.reference.y;
        let absolute = dy.atan2(dx).to_degrees();
        let raw = match target.part {
            Part::Leg => absolute,
            Part::Joint => absolute - state.leg(target.side),
        };
        let angle = state.apply_local_angle(target.side, target.part, raw)?;
        Some(AngleCommit {
            side: target.side,
            part: target.part,
            angle,
        })
    }

    /// Pointer-up: drop the target and return whether a drag was active.
    pub fn end(&mut self) -> bool {
        self.target.take().is_some()
    }
}
