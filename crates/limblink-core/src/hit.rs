//! Pointer hit-testing against the rig's grab points.

use kurbo::Point;

use crate::model::{limb_geometry, Part, RigConfig, RobotState, Side};

/// Tolerance in world units for grabbing a pivot or knee. The render
/// layer draws affordance rings at this radius so what you see is what
/// you can grab.
pub const HANDLE_HIT_RADIUS: f64 = 24.0;

/// The grab point a drag gesture latched onto.
///
/// `reference` is the center the drag angle is measured from, captured
/// at the moment of the hit: the pivot for a leg, the knee for a joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragTarget {
    pub side: Side,
    pub part: Part,
    pub reference: Point,
}

fn within(point: Point, center: Point, tolerance: f64) -> bool {
    let dx = point.x - center.x;
    let dy = point.y - center.y;
    dx * dx + dy * dy <= tolerance * tolerance
}

/// Test a world-space pointer position against all four grab points.
///
/// Order is fixed: left leg, left joint, right leg, right joint. The
/// first point within `tolerance` wins, so overlapping grab points
/// resolve the same way every frame.
pub fn hit_test(
    state: &RobotState,
    rig: &RigConfig,
    point: Point,
    tolerance: f64,
) -> Option<DragTarget> {
    for side in Side::ALL {
        let geo = limb_geometry(state, side, rig);
        if within(point, geo.pivot, tolerance) {
            return Some(DragTarget {
                side,
                part: Part::Leg,
                reference: geo.pivot,
            });
        }
        if within(point, geo.knee, tolerance) {
            return Some(DragTarget {
                side,
                part: Part::Joint,
                reference: geo.knee,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_rig() -> RigConfig {
        RigConfig {
            left_pivot: Point::new(0.0, 0.0),
            right_pivot: Point::new(300.0, 0.0),
            leg_len: 30.0,
            joint_len: 30.0,
        }
    }

    #[test]
    fn test_hit_on_pivot_targets_leg() {
        let state = RobotState::default();
        let rig = RigConfig::default();
        let target = hit_test(&state, &rig, rig.left_pivot, HANDLE_HIT_RADIUS);
        let target = target.unwrap();
        assert_eq!(target.side, Side::Left);
        assert_eq!(target.part, Part::Leg);
        assert_eq!(target.reference, rig.left_pivot);
    }

    #[test]
    fn test_hit_on_knee_targets_joint() {
        let state = RobotState::default();
        let rig = RigConfig::default();
        let geo = limb_geometry(&state, Side::Right, &rig);
        let target = hit_test(&state, &rig, geo.knee, HANDLE_HIT_RADIUS).unwrap();
        assert_eq!(target.side, Side::Right);
        assert_eq!(target.part, Part::Joint);
        assert_eq!(target.reference, geo.knee);
    }

    #[test]
    fn test_miss_returns_none() {
        let state = RobotState::default();
        let rig = RigConfig::default();
        assert!(hit_test(&state, &rig, Point::new(5000.0, 5000.0), HANDLE_HIT_RADIUS).is_none());
    }

    #[test]
    fn test_boundary_distance_still_hits() {
        let state = RobotState::default();
        let rig = RigConfig::default();
        let point = Point::new(rig.left_pivot.x + HANDLE_HIT_RADIUS, rig.left_pivot.y);
        assert!(hit_test(&state, &rig, point, HANDLE_HIT_RADIUS).is_some());
        let outside = Point::new(rig.left_pivot.x + HANDLE_HIT_RADIUS + 0.01, rig.left_pivot.y);
        assert!(hit_test(&state, &rig, outside, HANDLE_HIT_RADIUS).is_none());
    }

    #[test]
    fn test_leg_wins_over_joint_when_overlapping() {
        // Short segments put the knee within tolerance of the pivot. A
        // pointer between them must resolve to the leg.
        let mut state = RobotState::default();
        state.left_leg = 0.0;
        let rig = short_rig();
        let target = hit_test(&state, &rig, Point::new(15.0, 0.0), 24.0).unwrap();
        assert_eq!(target.part, Part::Leg);
        assert_eq!(target.side, Side::Left);
    }

    #[test]
    fn test_left_wins_over_right_when_overlapping() {
        let state = RobotState::default();
        let mut rig = short_rig();
        rig.right_pivot = rig.left_pivot;
        let target = hit_test(&state, &rig, rig.left_pivot, 24.0).unwrap();
        assert_eq!(target.side, Side::Left);
    }

    #[test]
    fn test_reference_follows_current_pose() {
        let mut state = RobotState::default();
        let rig = RigConfig::default();
        let before = limb_geometry(&state, Side::Left, &rig).knee;
        let target = hit_test(&state, &rig, before, HANDLE_HIT_RADIUS).unwrap();
        assert_eq!(target.reference, before);

        state.apply_local_angle(Side::Left, Part::Leg, 90.0);
        let after = limb_geometry(&state, Side::Left, &rig).knee;
        assert!(before != after);
        let target = hit_test(&state, &rig, after, HANDLE_HIT_RADIUS).unwrap();
        assert_eq!(target.reference, after);
    }
}
