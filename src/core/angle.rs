//! Interior joint angle from three landmarks.

use crate::config::JointConfig;
use crate::pose::types::{Frame, JointTriple};

/// Rays shorter than this are treated as collapsed onto the vertex.
pub const DEGENERATE_EPSILON: f64 = 1e-9;

/// Angle reported when the rays cannot define one (collapsed or non-finite).
pub const DEGENERATE_ANGLE: f64 = 180.0;

/// Calculate the interior angle at `vertex` in degrees, in `[0, 180]`.
///
/// Each ray's direction comes from `atan2` of its y/x difference; the
/// absolute difference of the two directions is folded back with
/// `360 - angle` when it exceeds 180. Ray order does not matter.
///
/// A vertex that coincides with either endpoint, or any non-finite
/// coordinate, yields [`DEGENERATE_ANGLE`] (a straight limb).
pub fn joint_angle(proximal: (f64, f64), vertex: (f64, f64), distal: (f64, f64)) -> f64 {
    let v1 = (proximal.0 - vertex.0, proximal.1 - vertex.1);
    let v2 = (distal.0 - vertex.0, distal.1 - vertex.1);

    if !(v1.0.is_finite() && v1.1.is_finite() && v2.0.is_finite() && v2.1.is_finite()) {
        return DEGENERATE_ANGLE;
    }
    if v1.0.hypot(v1.1) < DEGENERATE_EPSILON || v2.0.hypot(v2.1) < DEGENERATE_EPSILON {
        return DEGENERATE_ANGLE;
    }

    let radians = v2.1.atan2(v2.0) - v1.1.atan2(v1.0);
    let angle = radians.to_degrees().abs();
    if angle > 180.0 {
        360.0 - angle
    } else {
        angle
    }
}

/// Whether the triple's rays are long enough to define an angle.
pub fn is_degenerate(proximal: (f64, f64), vertex: (f64, f64), distal: (f64, f64)) -> bool {
    let d1 = (proximal.0 - vertex.0).hypot(proximal.1 - vertex.1);
    let d2 = (distal.0 - vertex.0).hypot(distal.1 - vertex.1);
    !(d1 >= DEGENERATE_EPSILON && d2 >= DEGENERATE_EPSILON)
}

/// Angle for a joint triple in a frame, if all three joints are present.
pub fn triple_angle(frame: &Frame, triple: JointTriple) -> Option<f64> {
    let proximal = frame.landmark(triple.proximal)?.point();
    let vertex = frame.landmark(triple.vertex)?.point();
    let distal = frame.landmark(triple.distal)?.point();
    Some(joint_angle(proximal, vertex, distal))
}

/// Left and right angles plus their mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BilateralAngle {
    pub left: f64,
    pub right: f64,
}

impl BilateralAngle {
    /// Mean of both sides; averages out single-side tracking noise.
    pub fn mean(&self) -> f64 {
        (self.left + self.right) / 2.0
    }
}

/// Left and right angles for the exercise's joint triples. `None` if any
/// joint is missing.
pub fn knee_angles(frame: &Frame, joints: &JointConfig) -> Option<BilateralAngle> {
    Some(BilateralAngle {
        left: triple_angle(frame, joints.left)?,
        right: triple_angle(frame, joints.right)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_leg() {
        let angle = joint_angle((0.5, 0.2), (0.5, 0.5), (0.5, 0.8));
        assert!((angle - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_right_angle() {
        let angle = joint_angle((0.0, 0.0), (0.5, 0.0), (0.5, 0.5));
        assert!((angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_reflex_difference_is_folded() {
        // Ray directions at +170 and -170 degrees differ by 340; interior angle is 20.
        let a = (170f64.to_radians().cos(), 170f64.to_radians().sin());
        let b = ((-170f64).to_radians().cos(), (-170f64).to_radians().sin());
        let angle = joint_angle(a, (0.0, 0.0), b);
        assert!((angle - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_order_independent() {
        let p = (0.1, 0.3);
        let v = (0.4, 0.5);
        let d = (0.45, 0.9);
        assert!((joint_angle(p, v, d) - joint_angle(d, v, p)).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_inputs_are_defined() {
        let cases = [
            ((0.5, 0.5), (0.5, 0.5), (0.5, 0.8)),
            ((0.5, 0.2), (0.5, 0.5), (0.5, 0.5)),
            ((0.5, 0.5), (0.5, 0.5), (0.5, 0.5)),
            ((f64::NAN, 0.2), (0.5, 0.5), (0.5, 0.8)),
            ((0.5, 0.2), (0.5, f64::INFINITY), (0.5, 0.8)),
        ];
        for (p, v, d) in cases {
            let angle = joint_angle(p, v, d);
            assert!(!angle.is_nan());
            assert!((0.0..=180.0).contains(&angle));
            assert_eq!(angle, DEGENERATE_ANGLE);
        }
        assert!(is_degenerate((0.5, 0.5), (0.5, 0.5), (0.1, 0.1)));
        assert!(!is_degenerate((0.5, 0.2), (0.5, 0.5), (0.1, 0.1)));
    }

    #[test]
    fn test_range_over_sweep() {
        for deg in (0..360).step_by(7) {
            let r = (deg as f64).to_radians();
            let angle = joint_angle((r.cos(), r.sin()), (0.0, 0.0), (1.0, 0.0));
            assert!((0.0..=180.0).contains(&angle), "{deg} -> {angle}");
        }
    }

    #[test]
    fn test_knee_angles_mean() {
        let frame = crate::pose::synthetic::frame_with_leg_angles(0, 100.0, 120.0);
        let both = knee_angles(&frame, &JointConfig::default()).unwrap();
        assert!((both.left - 100.0).abs() < 1e-6);
        assert!((both.right - 120.0).abs() < 1e-6);
        assert!((both.mean() - 110.0).abs() < 1e-6);
    }

    #[test]
    fn test_knee_angles_need_both_sides() {
        let mut frame = crate::pose::synthetic::frame_with_knee_angle(0, 120.0);
        frame.set_landmark(JointTriple::RIGHT_KNEE.distal, None);
        assert!(knee_angles(&frame, &JointConfig::default()).is_none());
        assert!(triple_angle(&frame, JointTriple::LEFT_KNEE).is_some());
    }
}
