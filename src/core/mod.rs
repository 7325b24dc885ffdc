//! Rep detection core.
//!
//! This module contains:
//! - Joint angle calculation
//! - The visibility gate that decides whether a frame is analyzable
//! - The squat state machine
//! - Feedback selection
//! - The session tying them together

pub mod angle;
pub mod feedback;
pub mod session;
pub mod state_machine;
pub mod visibility;

// Re-export commonly used types
pub use angle::{joint_angle, knee_angles, BilateralAngle};
pub use feedback::{
    FeedbackDecision, FeedbackMessage, FeedbackPolicy, FeedbackSelector, FeedbackSource,
    CANNED_PHRASES,
};
pub use session::{Diagnostic, FrameReport, SquatSession};
pub use state_machine::{
    Direction, MachineSettings, Phase, RepEvent, SquatMachine, SquatState, Thresholds, Transition,
};
pub use visibility::{BlockReason, GateOutcome, VisibilityGate};
