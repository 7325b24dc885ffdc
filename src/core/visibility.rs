//! Visibility gate: decides whether a frame can be analyzed at all.
//!
//! The gate is stateless. A blocked frame is simply not analyzed; it never
//! advances or resets anything downstream.

use crate::core::angle::is_degenerate;
use crate::pose::types::{Frame, JointTriple};
use serde::{Deserialize, Serialize};

/// Default minimum visibility score for a required joint.
pub const DEFAULT_MIN_VISIBILITY: f64 = 0.5;

/// Why a frame was not analyzed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum BlockReason {
    /// Required joints the model did not report
    Missing { joints: Vec<usize> },
    /// Required joints reported below the visibility floor
    LowConfidence { joints: Vec<usize> },
    /// Required joints with NaN or infinite coordinates
    Malformed { joints: Vec<usize> },
    /// A joint triple collapsed onto its vertex
    Degenerate { vertex: usize },
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockReason::Missing { joints } => write!(f, "missing joints {joints:?}"),
            BlockReason::LowConfidence { joints } => write!(f, "low confidence joints {joints:?}"),
            BlockReason::Malformed { joints } => write!(f, "malformed joints {joints:?}"),
            BlockReason::Degenerate { vertex } => write!(f, "degenerate angle at joint {vertex}"),
        }
    }
}

/// Result of gating a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Visible,
    Blocked(BlockReason),
}

impl GateOutcome {
    /// Whether the frame may be analyzed.
    pub fn is_visible(&self) -> bool {
        matches!(self, GateOutcome::Visible)
    }
}

/// Checks required joints against presence, confidence and sanity rules.
#[derive(Debug, Clone)]
pub struct VisibilityGate {
    triples: Vec<JointTriple>,
    required: Vec<usize>,
    min_visibility: f64,
}

impl VisibilityGate {
    /// Build a gate requiring every joint of `triples` plus `extra` indices.
    pub fn new(triples: &[JointTriple], extra: &[usize], min_visibility: f64) -> Self {
        let mut required: Vec<usize> = triples
            .iter()
            .flat_map(|t| t.indices())
            .chain(extra.iter().copied())
            .collect();
        required.sort_unstable();
        required.dedup();

        Self {
            triples: triples.to_vec(),
            required,
            min_visibility,
        }
    }

    /// Gate for squats: both hips, knees and ankles.
    pub fn squat() -> Self {
        Self::new(
            &[JointTriple::LEFT_KNEE, JointTriple::RIGHT_KNEE],
            &[],
            DEFAULT_MIN_VISIBILITY,
        )
    }

    /// Sorted landmark indices that must be present.
    pub fn required_joints(&self) -> &[usize] {
        &self.required
    }

    /// Lowest accepted visibility score.
    pub fn min_visibility(&self) -> f64 {
        self.min_visibility
    }

    /// Check a frame. Reports the first failing rule: missing, malformed,
    /// low confidence, then degenerate geometry.
    pub fn check(&self, frame: &Frame) -> GateOutcome {
        let missing: Vec<usize> = self
            .required
            .iter()
            .copied()
            .filter(|&i| frame.landmark(i).is_none())
            .collect();
        if !missing.is_empty() {
            return GateOutcome::Blocked(BlockReason::Missing { joints: missing });
        }

        let present = |i: usize| frame.landmark(i).into_iter();

        let malformed: Vec<usize> = self
            .required
            .iter()
            .copied()
            .filter(|&i| present(i).any(|l| !l.is_finite()))
            .collect();
        if !malformed.is_empty() {
            return GateOutcome::Blocked(BlockReason::Malformed { joints: malformed });
        }

        // A NaN score fails the comparison and counts as low confidence.
        let low: Vec<usize> = self
            .required
            .iter()
            .copied()
            .filter(|&i| {
                present(i).any(|l| l.visibility.is_some_and(|v| !(v >= self.min_visibility)))
            })
            .collect();
        if !low.is_empty() {
            return GateOutcome::Blocked(BlockReason::LowConfidence { joints: low });
        }

        for triple in &self.triples {
            let point = |i| frame.landmark(i).map(|l| l.point());
            if let (Some(p), Some(v), Some(d)) = (
                point(triple.proximal),
                point(triple.vertex),
                point(triple.distal),
            ) {
                if is_degenerate(p, v, d) {
                    return GateOutcome::Blocked(BlockReason::Degenerate {
                        vertex: triple.vertex,
                    });
                }
            }
        }

        GateOutcome::Visible
    }
}

impl Default for VisibilityGate {
    fn default() -> Self {
        Self::squat()
    }
}
