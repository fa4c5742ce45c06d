//! LimbLink Core Library
//!
//! Platform-agnostic linkage state, kinematics and sync logic for the
//! LimbLink operator console.

pub mod bridge;
pub mod camera;
pub mod drag;
pub mod engine;
pub mod hit;
pub mod input;
pub mod model;
pub mod protocol;
pub mod sync;

pub use bridge::{ConnectionStatus, SyncBridge, SyncEvent};
pub use camera::Camera;
pub use drag::{AngleCommit, DragController};
pub use engine::{Engine, EngineEvent};
pub use hit::{hit_test, DragTarget, HANDLE_HIT_RADIUS};
pub use input::InputState;
pub use model::{
    limb_geometry, LimbGeometry, Part, RigConfig, RobotState, Side, JOINT_MAX, JOINT_MIN, LEG_MAX,
    LEG_MIN, START_LEG_ANGLE,
};
pub use protocol::{ClientMessage, ServerMessage};
pub use sync::{ChannelEvent, ConnectionState, NativeWebSocket, ReconnectPolicy};
