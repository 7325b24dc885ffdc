//! Pose landmark and frame types.
//!
//! Landmarks follow the 33-point MediaPipe pose topology: a landmark's
//! position within the frame identifies the joint it describes.

use serde::{Deserialize, Serialize};

pub const NOSE: usize = 0;
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_ELBOW: usize = 13;
pub const RIGHT_ELBOW: usize = 14;
pub const LEFT_WRIST: usize = 15;
pub const RIGHT_WRIST: usize = 16;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;
pub const LEFT_KNEE: usize = 25;
pub const RIGHT_KNEE: usize = 26;
pub const LEFT_ANKLE: usize = 27;
pub const RIGHT_ANKLE: usize = 28;

/// Number of landmarks produced per frame by the pose model.
pub const POSE_LANDMARK_COUNT: usize = 33;

/// A single normalized body-joint position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal position, 0-1 normalized
    pub x: f64,
    /// Vertical position, 0-1 normalized (grows downwards)
    pub y: f64,
    /// Relative depth, when the model provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    /// Model confidence that the joint is visible
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
}

impl Landmark {
    /// A 2D landmark without depth or visibility.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            visibility: None,
        }
    }

    /// Attach a visibility score.
    pub fn with_visibility(mut self, visibility: f64) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// 2D position as a tuple.
    pub fn point(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Whether every coordinate present is a finite number.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.map_or(true, f64::is_finite)
    }
}

/// All landmarks observed at one capture instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Monotonic capture time in milliseconds
    pub timestamp_ms: u64,
    /// Landmarks indexed by joint; `None` marks a joint the model did not report
    pub landmarks: Vec<Option<Landmark>>,
}

impl Frame {
    /// A frame from already indexed landmark slots.
    pub fn new(timestamp_ms: u64, landmarks: Vec<Option<Landmark>>) -> Self {
        Self {
            timestamp_ms,
            landmarks,
        }
    }

    /// A frame with every slot of the pose topology empty.
    pub fn empty(timestamp_ms: u64) -> Self {
        Self::new(timestamp_ms, vec![None; POSE_LANDMARK_COUNT])
    }

    /// Look up a joint by index.
    pub fn landmark(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index).and_then(Option::as_ref)
    }

    /// Set a joint, growing the landmark list if needed.
    pub fn set_landmark(&mut self, index: usize, landmark: Option<Landmark>) {
        if index >= self.landmarks.len() {
            self.landmarks.resize(index + 1, None);
        }
        self.landmarks[index] = landmark;
    }

    /// Number of joints actually present.
    pub fn present_count(&self) -> usize {
        self.landmarks.iter().filter(|l| l.is_some()).count()
    }
}

/// Three joints forming an angle: proximal, vertex and distal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointTriple {
    pub proximal: usize,
    pub vertex: usize,
    pub distal: usize,
}

impl JointTriple {
    /// A triple whose angle is measured at `vertex`.
    pub const fn new(proximal: usize, vertex: usize, distal: usize) -> Self {
        Self {
            proximal,
            vertex,
            distal,
        }
    }

    pub const LEFT_KNEE: JointTriple = JointTriple::new(LEFT_HIP, LEFT_KNEE, LEFT_ANKLE);
    pub const RIGHT_KNEE: JointTriple = JointTriple::new(RIGHT_HIP, RIGHT_KNEE, RIGHT_ANKLE);
    pub const LEFT_ELBOW: JointTriple = JointTriple::new(LEFT_SHOULDER, LEFT_ELBOW, LEFT_WRIST);
    pub const RIGHT_ELBOW: JointTriple =
        JointTriple::new(RIGHT_SHOULDER, RIGHT_ELBOW, RIGHT_WRIST);

    /// The three landmark indices, proximal first.
    pub fn indices(&self) -> [usize; 3] {
        [self.proximal, self.vertex, self.distal]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_lookup() {
        let mut frame = Frame::empty(100);
        frame.set_landmark(LEFT_KNEE, Some(Landmark::new(0.4, 0.6)));

        assert_eq!(frame.present_count(), 1);
        assert_eq!(frame.landmark(LEFT_KNEE).map(|l| l.point()), Some((0.4, 0.6)));
        assert!(frame.landmark(RIGHT_KNEE).is_none());
        assert!(frame.landmark(99).is_none());
    }

    #[test]
    fn test_set_landmark_grows_frame() {
        let mut frame = Frame::new(0, Vec::new());
        frame.set_landmark(RIGHT_ANKLE, Some(Landmark::new(0.5, 0.9)));
        assert_eq!(frame.landmarks.len(), RIGHT_ANKLE + 1);
    }

    #[test]
    fn test_landmark_json_defaults() {
        let lm: Landmark = serde_json::from_str(r#"{"x":0.1,"y":0.2}"#).unwrap();
        assert_eq!(lm.visibility, None);
        assert_eq!(lm.z, None);

        let frame: Frame =
            serde_json::from_str(r#"{"timestamp_ms":5,"landmarks":[null,{"x":0.1,"y":0.2,"visibility":0.9}]}"#)
                .unwrap();
        assert!(frame.landmark(0).is_none());
        assert_eq!(frame.landmark(1).and_then(|l| l.visibility), Some(0.9));
    }

    #[test]
    fn test_non_finite_landmark() {
        assert!(Landmark::new(0.1, 0.2).is_finite());
        assert!(!Landmark::new(f64::NAN, 0.2).is_finite());
    }
}
