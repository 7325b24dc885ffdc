//! Synthetic squat streams.
//!
//! Builds frames whose hip/knee/ankle geometry produces an exact knee angle,
//! so rep detection can be exercised without a camera or a pose model.

use crate::pose::types::{
    Frame, Landmark, LEFT_ANKLE, LEFT_HIP, LEFT_KNEE, RIGHT_ANKLE, RIGHT_HIP, RIGHT_KNEE,
};

const LEFT_KNEE_POS: (f64, f64) = (0.45, 0.65);
const RIGHT_KNEE_POS: (f64, f64) = (0.55, 0.65);
const SEGMENT_LEN: f64 = 0.2;
const VISIBILITY: f64 = 0.95;

/// Generator for cosine-profile squat reps at a fixed frame rate.
#[derive(Debug, Clone)]
pub struct SquatSynth {
    /// Frames per second of the generated stream
    pub fps: f64,
    /// Duration of one stand-bottom-stand cycle
    pub rep_duration_ms: u64,
    /// Knee angle when standing
    pub standing_angle: f64,
    /// Knee angle at the bottom of the squat
    pub bottom_angle: f64,
    /// Timestamp of the first frame
    pub start_ms: u64,
}

impl SquatSynth {
    /// Three-second reps from 175° down to 80°, starting at 0 ms.
    pub fn new(fps: f64) -> Self {
        Self {
            fps,
            rep_duration_ms: 3_000,
            standing_angle: 175.0,
            bottom_angle: 80.0,
            start_ms: 0,
        }
    }

    /// Set the length of one rep.
    pub fn with_rep_duration(mut self, ms: u64) -> Self {
        self.rep_duration_ms = ms;
        self
    }

    /// Set the first frame timestamp.
    pub fn with_start(mut self, start_ms: u64) -> Self {
        self.start_ms = start_ms;
        self
    }

    /// Knee angle `elapsed_ms` into the stream.
    pub fn angle_at(&self, elapsed_ms: f64) -> f64 {
        let period = self.rep_duration_ms.max(1) as f64;
        let phase = (elapsed_ms % period) / period;
        let depth = (1.0 + (2.0 * std::f64::consts::PI * phase).cos()) / 2.0;
        self.bottom_angle + (self.standing_angle - self.bottom_angle) * depth
    }

    /// Number of frames [`reps`](Self::reps) would produce. Saturates instead
    /// of overflowing for absurd inputs.
    pub fn frame_count(&self, reps: u32) -> u64 {
        let total_ms = (reps as u64).saturating_mul(self.rep_duration_ms) as f64;
        let count = (total_ms * self.fps / 1000.0).floor();
        if count.is_finite() && count >= 0.0 {
            (count as u64).saturating_add(1)
        } else {
            1
        }
    }

    /// Frames covering `reps` full cycles, ending standing.
    pub fn reps(&self, reps: u32) -> Vec<Frame> {
        let step_ms = 1000.0 / self.fps;

        (0..self.frame_count(reps))
            .map(|k| {
                let elapsed = k as f64 * step_ms;
                let timestamp = self.start_ms + elapsed.round() as u64;
                frame_with_knee_angle(timestamp, self.angle_at(elapsed))
            })
            .collect()
    }
}

/// A frame with both legs bent to `angle` degrees at the knee.
pub fn frame_with_knee_angle(timestamp_ms: u64, angle: f64) -> Frame {
    frame_with_leg_angles(timestamp_ms, angle, angle)
}

/// A frame with independent left and right knee angles.
pub fn frame_with_leg_angles(timestamp_ms: u64, left: f64, right: f64) -> Frame {
    let mut frame = Frame::empty(timestamp_ms);
    place_leg(&mut frame, [LEFT_HIP, LEFT_KNEE, LEFT_ANKLE], LEFT_KNEE_POS, left, 1.0);
    place_leg(&mut frame, [RIGHT_HIP, RIGHT_KNEE, RIGHT_ANKLE], RIGHT_KNEE_POS, right, -1.0);
    frame
}

/// A frame in which the legs were not detected.
pub fn occluded_frame(timestamp_ms: u64) -> Frame {
    Frame::empty(timestamp_ms)
}

fn place_leg(frame: &mut Frame, joints: [usize; 3], knee: (f64, f64), angle: f64, side: f64) {
    let theta = angle.to_radians();
    // Ankle hangs straight below the knee; the hip ray is rotated by the knee angle.
    let ankle = (knee.0, knee.1 + SEGMENT_LEN);
    let hip = (
        knee.0 + side * SEGMENT_LEN * theta.sin(),
        knee.1 + SEGMENT_LEN * theta.cos(),
    );

    for (index, (x, y)) in joints.into_iter().zip([hip, knee, ankle]) {
        frame.set_landmark(index, Some(Landmark::new(x, y).with_visibility(VISIBILITY)));
    }
}
