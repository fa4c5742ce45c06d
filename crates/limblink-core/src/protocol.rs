//! Wire protocol spoken over the control channel.
//!
//! Every frame is a JSON object tagged by `type`. The console only ever
//! sends [`ClientMessage`] and only ever receives [`ServerMessage`].

use serde::{Deserialize, Serialize};

use crate::model::{RobotState, START_LEG_ANGLE, Side};

/// Console to controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Request one leg's absolute angle, in degrees
    SetLeg { side: Side, angle: f64 },
    /// Request one joint's angle relative to its own leg, in degrees
    SetJoint { side: Side, angle: f64 },
    /// Flush pending angles to the actuator bus immediately
    SendNow,
    /// Ask for a full authoritative snapshot
    GetStatus,
}

/// Controller to console
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full authoritative snapshot of all four angles. Replaces the
    /// local pose wholesale whenever it arrives.
    StateUpdate {
        left_leg: LegEntry,
        left_joint: JointEntry,
        right_leg: LegEntry,
        right_joint: JointEntry,
    },
    /// A request the controller refused, with a human-readable reason
    Error { message: String },
}

/// Snapshot entry for a leg: the current absolute angle plus the fixed
/// power-up angle the controller measures its travel limits from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegEntry {
    pub angle: f64,
    pub initial: f64,
}

/// Snapshot entry for a joint, relative to its leg
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointEntry {
    pub angle: f64,
}

impl ServerMessage {
    /// Build a snapshot frame from a full pose
    pub fn state_update(state: &RobotState) -> Self {
        ServerMessage::StateUpdate {
            left_leg: LegEntry {
                angle: state.left_leg,
                initial: START_LEG_ANGLE,
            },
            left_joint: JointEntry {
                angle: state.left_joint,
            },
            right_leg: LegEntry {
                angle: state.right_leg,
                initial: START_LEG_ANGLE,
            },
            right_joint: JointEntry {
                angle: state.right_joint,
            },
        }
    }
}

impl ClientMessage {
    /// Angle request for one degree of freedom
    pub fn set_angle(side: Side, part: crate::model::Part, angle: f64) -> Self {
        match part {
            crate::model::Part::Leg => ClientMessage::SetLeg { side, angle },
            crate::model::Part::Joint => ClientMessage::SetJoint { side, angle },
        }
    }
}
