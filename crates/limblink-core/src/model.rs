//! Linkage state and forward kinematics.
//!
//! A rig has two limbs, each a leg segment swinging around a fixed pivot
//! and a joint segment swinging around the knee. Angles are degrees:
//! legs are absolute (0° points along +x, increasing toward +y), joints
//! are relative to their own leg.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Lower bound for an absolute leg angle in degrees
pub const LEG_MIN: f64 = -15.0;
/// Upper bound for an absolute leg angle in degrees
pub const LEG_MAX: f64 = 105.0;
/// Lower bound for a joint angle relative to its leg, in degrees
pub const JOINT_MIN: f64 = 0.0;
/// Upper bound for a joint angle relative to its leg, in degrees
pub const JOINT_MAX: f64 = 60.0;
/// Absolute leg angle both legs power up at
pub const START_LEG_ANGLE: f64 = 45.0;

/// Which limb of the rig
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Hit-testing and UI rows iterate in this order
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    pub fn label(&self) -> &str {
        match self {
            Side::Left => "Left",
            Side::Right => "Right",
        }
    }
}

/// Which degree of freedom within a limb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Part {
    Leg,
    Joint,
}

impl Part {
    pub fn label(&self) -> &str {
        match self {
            Part::Leg => "leg",
            Part::Joint => "joint",
        }
    }

    /// Clamp range for this degree of freedom
    pub fn range(&self) -> (f64, f64) {
        match self {
            Part::Leg => (LEG_MIN, LEG_MAX),
            Part::Joint => (JOINT_MIN, JOINT_MAX),
        }
    }
}

/// The four controllable angles of the rig, in degrees.
///
/// This is the single authoritative pose. Geometry is always derived
/// from it on demand, never stored alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotState {
    pub left_leg: f64,
    pub left_joint: f64,
    pub right_leg: f64,
    pub right_joint: f64,
}

impl Default for RobotState {
    fn default() -> Self {
        Self {
            left_leg: START_LEG_ANGLE,
            left_joint: 0.0,
            right_leg: START_LEG_ANGLE,
            right_joint: 0.0,
        }
    }
}

impl RobotState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn angle(&self, side: Side, part: Part) -> f64 {
        match (side, part) {
            (Side::Left, Part::Leg) => self.left_leg,
            (Side::Left, Part::Joint) => self.left_joint,
            (Side::Right, Part::Leg) => self.right_leg,
            (Side::Right, Part::Joint) => self.right_joint,
        }
    }

    pub fn leg(&self, side: Side) -> f64 {
        self.angle(side, Part::Leg)
    }

    pub fn joint(&self, side: Side) -> f64 {
        self.angle(side, Part::Joint)
    }

    /// Overwrite one angle without clamping. Authoritative snapshots from
    /// the controller land through this, trusted as-is.
    pub fn set_angle(&mut self, side: Side, part: Part, angle: f64) {
        match (side, part) {
            (Side::Left, Part::Leg) => self.left_leg = angle,
            (Side::Left, Part::Joint) => self.left_joint = angle,
            (Side::Right, Part::Leg) => self.right_leg = angle,
            (Side::Right, Part::Joint) => self.right_joint = angle,
        }
    }

    /// Apply a locally produced angle, clamping it into the part's range.
    ///
    /// `raw` is in the part's own frame: absolute for legs, relative to
    /// the same side's leg for joints. Non-finite input is ignored and
    /// leaves the state untouched.
    pub fn apply_local_angle(&mut self, side: Side, part: Part, raw: f64) -> Option<f64> {
        if !raw.is_finite() {
            return None;
        }
        let (min, max) = part.range();
        let clamped = raw.clamp(min, max);
        self.set_angle(side, part, clamped);
        Some(clamped)
    }
}

/// Fixed mounting geometry of a rig: where the pivots sit and how long
/// the two segments are, all in world units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigConfig {
    pub left_pivot: Point,
    pub right_pivot: Point,
    pub leg_len: f64,
    pub joint_len: f64,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            left_pivot: Point::new(-160.0, -80.0),
            right_pivot: Point::new(160.0, -80.0),
            leg_len: 130.0,
            joint_len: 110.0,
        }
    }
}

impl RigConfig {
    pub fn pivot(&self, side: Side) -> Point {
        match side {
            Side::Left => self.left_pivot,
            Side::Right => self.right_pivot,
        }
    }

    /// Box covering everything the rig can reach, for fitting the view
    pub fn reach_bounds(&self) -> Rect {
        let reach = self.leg_len + self.joint_len;
        let around = |p: Point| Rect::new(p.x - reach, p.y - reach, p.x + reach, p.y + reach);
        around(self.left_pivot).union(around(self.right_pivot))
    }
}

/// World positions of one limb's three marker points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimbGeometry {
    pub pivot: Point,
    pub knee: Point,
    pub foot: Point,
}

/// Derive one limb's geometry from the current pose.
///
/// knee = pivot + leg_len * (cos, sin)(leg), foot = knee + joint_len *
/// (cos, sin)(leg + joint). Callers re-derive every time they need it.
pub fn limb_geometry(state: &RobotState, side: Side, rig: &RigConfig) -> LimbGeometry {
    let pivot = rig.pivot(side);
    let leg = state.leg(side).to_radians();
    let knee = Point::new(
        pivot.x + rig.leg_len * leg.cos(),
        pivot.y + rig.leg_len * leg.sin(),
    );
    let reach = (state.leg(side) + state.joint(side)).to_radians();
    let foot = Point::new(
        knee.x + rig.joint_len * reach.cos(),
        knee.y + rig.joint_len * reach.sin(),
    );
    LimbGeometry { pivot, knee, foot }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = RobotState::default();
        assert!((state.left_leg - 45.0).abs() < f64::EPSILON);
        assert!((state.right_leg - 45.0).abs() < f64::EPSILON);
        assert!(state.left_joint.abs() < f64::EPSILON);
        assert!(state.right_joint.abs() < f64::EPSILON);
    }

    #[test]
    fn test_angle_accessor_covers_all_fields() {
        let state = RobotState {
            left_leg: 1.0,
            left_joint: 2.0,
            right_leg: 3.0,
            right_joint: 4.0,
        };
        assert!((state.angle(Side::Left, Part::Leg) - 1.0).abs() < f64::EPSILON);
        assert!((state.angle(Side::Left, Part::Joint) - 2.0).abs() < f64::EPSILON);
        assert!((state.angle(Side::Right, Part::Leg) - 3.0).abs() < f64::EPSILON);
        assert!((state.angle(Side::Right, Part::Joint) - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_leg_angles_clamp_to_range() {
        let mut state = RobotState::default();
        assert_eq!(state.apply_local_angle(Side::Left, Part::Leg, 200.0), Some(105.0));
        assert!((state.left_leg - 105.0).abs() < f64::EPSILON);
        assert_eq!(state.apply_local_angle(Side::Left, Part::Leg, -90.0), Some(-15.0));
        assert!((state.left_leg - -15.0).abs() < f64::EPSILON);
        assert_eq!(state.apply_local_angle(Side::Left, Part::Leg, 60.0), Some(60.0));
    }

    #[test]
    fn test_joint_angles_clamp_to_range() {
        let mut state = RobotState::default();
        assert_eq!(state.apply_local_angle(Side::Right, Part::Joint, -10.0), Some(0.0));
        assert_eq!(state.apply_local_angle(Side::Right, Part::Joint, 75.0), Some(60.0));
        assert!((state.right_joint - 60.0).abs() < f64::EPSILON);
        assert_eq!(state.apply_local_angle(Side::Right, Part::Joint, 30.0), Some(30.0));
    }

    #[test]
    fn test_non_finite_angles_are_ignored() {
        let mut state = RobotState::default();
        let before = state;
        assert_eq!(state.apply_local_angle(Side::Left, Part::Leg, f64::NAN), None);
        assert_eq!(state.apply_local_angle(Side::Left, Part::Leg, f64::INFINITY), None);
        assert_eq!(
            state.apply_local_angle(Side::Right, Part::Joint, f64::NEG_INFINITY),
            None
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_set_angle_skips_clamping() {
        let mut state = RobotState::default();
        state.set_angle(Side::Left, Part::Leg, 300.0);
        assert!((state.left_leg - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_limb_geometry_straight_limb() {
        let mut state = RobotState::default();
        state.left_leg = 0.0;
        state.left_joint = 0.0;
        let rig = RigConfig::default();
        let geo = limb_geometry(&state, Side::Left, &rig);
        assert!((geo.knee.x - (rig.left_pivot.x + rig.leg_len)).abs() < 1e-9);
        assert!((geo.knee.y - rig.left_pivot.y).abs() < 1e-9);
        assert!((geo.foot.x - (geo.knee.x + rig.joint_len)).abs() < 1e-9);
        assert!((geo.foot.y - geo.knee.y).abs() < 1e-9);
    }

    #[test]
    fn test_limb_geometry_joint_is_relative_to_leg() {
        let mut state = RobotState::default();
        state.right_leg = 45.0;
        state.right_joint = 15.0;
        let rig = RigConfig::default();
        let geo = limb_geometry(&state, Side::Right, &rig);
        let reach = 60.0_f64.to_radians();
        let expected_x = geo.knee.x + rig.joint_len * reach.cos();
        let expected_y = geo.knee.y + rig.joint_len * reach.sin();
        assert!((geo.foot.x - expected_x).abs() < 1e-9);
        assert!((geo.foot.y - expected_y).abs() < 1e-9);
    }

    #[test]
    fn test_limb_geometry_tracks_state_changes() {
        let mut state = RobotState::default();
        let rig = RigConfig::default();
        let before = limb_geometry(&state, Side::Left, &rig);
        state.apply_local_angle(Side::Left, Part::Leg, 90.0);
        let after = limb_geometry(&state, Side::Left, &rig);
        assert!(before.knee != after.knee);
        assert_eq!(before.pivot, after.pivot);
    }

    #[test]
    fn test_reach_bounds_cover_both_pivots() {
        let rig = RigConfig::default();
        let bounds = rig.reach_bounds();
        assert!(bounds.contains(rig.left_pivot));
        assert!(bounds.contains(rig.right_pivot));
        let reach = rig.leg_len + rig.joint_len;
        assert!((bounds.x0 - (rig.left_pivot.x - reach)).abs() < f64::EPSILON);
        assert!((bounds.x1 - (rig.right_pivot.x + reach)).abs() < f64::EPSILON);
    }
}
