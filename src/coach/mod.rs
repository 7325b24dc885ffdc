//! Coaching collaborators.
//!
//! The core never knows how feedback is rendered. It talks to three seams:
//! - [`CoachingSink`] receives every [`FeedbackMessage`]
//! - [`AdviceProvider`] produces rep advice asynchronously
//! - [`RealtimeCoach`] receives state updates while it is active
//!
//! [`CoachingDispatcher`] wires them together for one session.

pub mod advisor;
pub mod dispatcher;
pub mod sinks;

use crate::core::feedback::FeedbackMessage;
use crate::core::state_machine::SquatState;
use std::future::Future;
use std::pin::Pin;

pub use advisor::TipAdvisor;
pub use dispatcher::CoachingDispatcher;
pub use sinks::{ConsoleCoach, ConsoleSink, MemoryCoach, MemorySink};

/// Destination for feedback text (speech, UI, remote assistant).
pub trait CoachingSink: Send + Sync {
    fn accept(&self, message: FeedbackMessage);
}

/// Errors an advice provider may report. All are recovered locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdviceError {
    /// The provider is not configured or switched off
    Disabled,
    /// The provider could not be reached
    Transport(String),
    /// The provider answered with something unusable
    InvalidResponse(String),
}

impl std::fmt::Display for AdviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdviceError::Disabled => write!(f, "Advice provider disabled"),
            AdviceError::Transport(e) => write!(f, "Advice transport error: {e}"),
            AdviceError::InvalidResponse(e) => write!(f, "Invalid advice response: {e}"),
        }
    }
}

impl std::error::Error for AdviceError {}

/// Future returned by [`AdviceProvider::request`].
pub type AdviceFuture<'a> = Pin<Box<dyn Future<Output = Result<String, AdviceError>> + Send + 'a>>;

/// Source of short encouragement for a given rep count.
pub trait AdviceProvider: Send + Sync {
    fn request(&self, rep_count: u32) -> AdviceFuture<'_>;
}

/// State pushed to a real-time coach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoachUpdate {
    DepthReached,
    RepCompleted { count: u32 },
    Status { count: u32, state: SquatState },
}

impl CoachUpdate {
    /// Message text for a conversational coach.
    pub fn text(&self) -> String {
        match self {
            CoachUpdate::DepthReached => "User reached good squat depth".to_string(),
            CoachUpdate::RepCompleted { count } => {
                format!("User completed rep {count}! Give encouragement.")
            }
            CoachUpdate::Status { count, state } => format!(
                "Update: User has completed {count} reps. Current state: {state}. \
                 Give brief encouragement if appropriate."
            ),
        }
    }
}

/// A live coach (e.g. a voice assistant call) fed with periodic updates.
pub trait RealtimeCoach: Send + Sync {
    /// Whether the coach is connected and unobstructed.
    fn is_active(&self) -> bool;
    fn push_update(&self, update: CoachUpdate);
}
