//! Authoritative rig state and actuator output.
//!
//! The daemon owns the one true pose. Requests either pass validation
//! and move it, or bounce with a reason; nothing here clamps.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Leg angle every limb powers up at, in degrees.
pub const START_LEG_ANGLE: f64 = 45.0;
/// Legs travel at most this far from their power-up angle.
pub const LEG_TRAVEL: f64 = 60.0;
/// Joint travel relative to its own leg.
pub const JOINT_MIN: f64 = 0.0;
pub const JOINT_MAX: f64 = 60.0;
/// Minimum spacing between actuator writes.
pub const SEND_INTERVAL: Duration = Duration::from_millis(100);

/// Which limb of the rig
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// Where actuator frames go. The daemon talks to whatever sits behind
/// this, a hardware bus in the field or a logging stand-in on a desk.
pub trait ActuatorLink: Send {
    /// Push one pose frame down the wire.
    fn write_frame(&mut self, frame: &str) -> bool;
    /// True when real hardware is attached.
    fn is_ready(&self) -> bool;
}

/// Stand-in link that only logs frames.
pub struct DryRunLink;

impl ActuatorLink for DryRunLink {
    fn write_frame(&mut self, frame: &str) -> bool {
        info!("SEND: {} (dry run, no actuator bus attached)", frame);
        true
    }

    fn is_ready(&self) -> bool {
        false
    }
}

/// Snapshot entry for a leg: current absolute angle plus the power-up
/// angle its travel limits are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegStatus {
    pub angle: f64,
    pub initial: f64,
}

/// Snapshot entry for a joint, relative to its leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointStatus {
    pub angle: f64,
}

/// The full pose as consoles see it. Joints report their angle
/// relative to their own leg, not the absolute heading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseSnapshot {
    pub left_leg: LegStatus,
    pub left_joint: JointStatus,
    pub right_leg: LegStatus,
    pub right_joint: JointStatus,
}

/// One leg and the joint riding on it.
#[derive(Debug, Clone, Copy)]
struct Limb {
    /// Absolute leg angle, degrees
    leg: f64,
    /// Power-up leg angle; travel limits measure from here
    initial: f64,
    /// Joint angle relative to the leg
    joint: f64,
}

impl Limb {
    fn new(initial: f64) -> Self {
        Self {
            leg: initial,
            initial,
            joint: 0.0,
        }
    }
}

/// Rate limiter for actuator writes.
///
/// Writes inside the window are simply dropped. Every frame carries the
/// full pose, so the next write that gets through is always current.
pub struct SendThrottle {
    interval: Duration,
    last_send: Option<Instant>,
}

impl SendThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_send: None,
        }
    }

    /// True when enough time has passed; records the send when it is.
    pub fn should_send(&mut self, now: Instant) -> bool {
        match self.last_send {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last_send = Some(now);
                true
            }
        }
    }
}

/// State and bus output for one two-legged rig.
pub struct RobotController {
    left: Limb,
    right: Limb,
    link: Box<dyn ActuatorLink>,
    throttle: SendThrottle,
}

impl RobotController {
    pub fn new(link: Box<dyn ActuatorLink>) -> Self {
        Self {
            left: Limb::new(START_LEG_ANGLE),
            right: Limb::new(START_LEG_ANGLE),
            link,
            throttle: SendThrottle::new(SEND_INTERVAL),
        }
    }

    fn limb_mut(&mut self, side: Side) -> &mut Limb {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// Set one leg's absolute angle.
    ///
    /// The travel check is wrap-aware: -320 and 40 degrees are the same
    /// heading, so both pass against an initial of 45.
    pub fn set_leg(&mut self, side: Side, angle: f64) -> Result<(), String> {
        let limb = self.limb_mut(side);
        let diff = (angle - limb.initial + 180.0).rem_euclid(360.0) - 180.0;
        if (-LEG_TRAVEL..=LEG_TRAVEL).contains(&diff) {
            limb.leg = angle;
            Ok(())
        } else {
            Err(format!(
                "Angle out of allowed range ({:.0} +/- {:.0})",
                limb.initial, LEG_TRAVEL
            ))
        }
    }

    /// Set one joint's angle relative to its leg.
    pub fn set_joint(&mut self, side: Side, angle: f64) -> Result<(), String> {
        if (JOINT_MIN..=JOINT_MAX).contains(&angle) {
            self.limb_mut(side).joint = angle;
            Ok(())
        } else {
            Err(format!(
                "Relative angle must be between {:.0} and {:.0}",
                JOINT_MIN, JOINT_MAX
            ))
        }
    }

    /// The pose as broadcast to consoles.
    pub fn snapshot(&self) -> PoseSnapshot {
        PoseSnapshot {
            left_leg: LegStatus {
                angle: self.left.leg,
                initial: self.left.initial,
            },
            left_joint: JointStatus {
                angle: self.left.joint,
            },
            right_leg: LegStatus {
                angle: self.right.leg,
                initial: self.right.initial,
            },
            right_joint: JointStatus {
                angle: self.right.joint,
            },
        }
    }

    /// Frame for the actuator bus: four right-aligned integer columns,
    /// joint before leg, left pair before right.
    pub fn wire_frame(&self) -> String {
        let left_joint = self.left.joint.round() as i64;
        let left_leg = self.left.leg.round() as i64;
        let right_joint = self.right.joint.round() as i64;
        let right_leg = self.right.leg.round() as i64;
        format!("{left_joint:3}/{left_leg:3}/{right_joint:3}/{right_leg:3}")
    }

    /// Write the current pose to the link, ignoring the throttle.
    pub fn send_now(&mut self) -> bool {
        let frame = self.wire_frame();
        self.link.write_frame(&frame)
    }

    /// Write the current pose if the rate limiter allows it.
    pub fn send_throttled(&mut self, now: Instant) -> bool {
        if self.throttle.should_send(now) {
            self.send_now()
        } else {
            false
        }
    }

    /// True when a physical actuator bus is attached.
    pub fn link_ready(&self) -> bool {
        self.link.is_ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> RobotController {
        RobotController::new(Box::new(DryRunLink))
    }

    #[test]
    fn test_power_up_pose() {
        let snapshot = controller().snapshot();
        assert!((snapshot.left_leg.angle - 45.0).abs() < f64::EPSILON);
        assert!((snapshot.left_leg.initial - 45.0).abs() < f64::EPSILON);
        assert!((snapshot.left_joint.angle).abs() < f64::EPSILON);
        assert!((snapshot.right_leg.angle - 45.0).abs() < f64::EPSILON);
        assert!((snapshot.right_joint.angle).abs() < f64::EPSILON);
    }

    #[test]
    fn test_set_leg_within_travel() {
        let mut controller = controller();
        assert!(controller.set_leg(Side::Left, 80.0).is_ok());
        assert!((controller.snapshot().left_leg.angle - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_set_leg_beyond_travel_is_refused() {
        let mut controller = controller();
        let err = controller.set_leg(Side::Left, 130.0).unwrap_err();
        assert_eq!(err, "Angle out of allowed range (45 +/- 60)");
        // Pose untouched on refusal
        assert!((controller.snapshot().left_leg.angle - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_set_leg_accepts_wrapped_angle() {
        // -320 is the same heading as +40, inside 45 +/- 60
        let mut controller = controller();
        assert!(controller.set_leg(Side::Right, -320.0).is_ok());
        // Stored verbatim, not normalized
        assert!((controller.snapshot().right_leg.angle - (-320.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_set_leg_refuses_wrapped_out_of_travel() {
        // -240 wraps to +120, which is 75 past the initial 45
        let mut controller = controller();
        assert!(controller.set_leg(Side::Left, -240.0).is_err());
    }

    #[test]
    fn test_set_joint_range() {
        let mut controller = controller();
        assert!(controller.set_joint(Side::Left, 0.0).is_ok());
        assert!(controller.set_joint(Side::Left, 60.0).is_ok());
        let err = controller.set_joint(Side::Left, 60.1).unwrap_err();
        assert_eq!(err, "Relative angle must be between 0 and 60");
        assert!(controller.set_joint(Side::Left, -0.1).is_err());
    }

    #[test]
    fn test_snapshot_joints_stay_relative() {
        let mut controller = controller();
        controller.set_leg(Side::Left, 60.0).unwrap();
        controller.set_joint(Side::Left, 30.0).unwrap();
        // 30 relative, not 90 absolute
        assert!((controller.snapshot().left_joint.angle - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_wire_frame_layout() {
        let mut controller = controller();
        assert_eq!(controller.wire_frame(), "  0/ 45/  0/ 45");

        controller.set_leg(Side::Left, 100.0).unwrap();
        controller.set_joint(Side::Right, 30.0).unwrap();
        assert_eq!(controller.wire_frame(), "  0/100/ 30/ 45");
    }

    #[test]
    fn test_wire_frame_rounds_to_integers() {
        let mut controller = controller();
        controller.set_leg(Side::Left, 72.6).unwrap();
        controller.set_joint(Side::Left, 10.4).unwrap();
        assert_eq!(controller.wire_frame(), " 10/ 73/  0/ 45");
    }

    #[test]
    fn test_throttle_drops_within_window() {
        let mut throttle = SendThrottle::new(Duration::from_millis(100));
        let t0 = Instant::now();
        assert!(throttle.should_send(t0));
        assert!(!throttle.should_send(t0 + Duration::from_millis(50)));
        assert!(throttle.should_send(t0 + Duration::from_millis(150)));
    }

    #[test]
    fn test_first_send_always_passes() {
        let mut throttle = SendThrottle::new(SEND_INTERVAL);
        assert!(throttle.should_send(Instant::now()));
    }

    #[test]
    fn test_send_now_ignores_throttle() {
        let mut controller = controller();
        let t0 = Instant::now();
        assert!(controller.send_throttled(t0));
        // Inside the window the throttled path drops the frame
        assert!(!controller.send_throttled(t0 + Duration::from_millis(10)));
        // send_now goes straight to the link
        assert!(controller.send_now());
    }
}
