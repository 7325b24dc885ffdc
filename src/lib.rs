//! Squat Coach - debounced rep detection from pose landmark streams.
//!
//! This library turns per-frame body-joint coordinates from an external
//! pose-estimation model into reliable squat repetition events and coaching
//! feedback.
//!
//! # Guarantees
//!
//! - **No double counting**: reps need a committed valley and respect a debounce interval
//! - **Gapless sequence numbers**: rep `n` is always followed by rep `n + 1`
//! - **Occlusion safe**: frames without the required joints never touch the state machine
//! - **Frame-rate independent**: all timing uses capture timestamps
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Squat Session                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌────────────┐   ┌────────────┐   ┌──────────┐ │
//! │  │ Visibility │──▶│   Joint    │──▶│   State    │──▶│ Feedback │ │
//! │  │    Gate    │   │   Angle    │   │  Machine   │   │ Selector │ │
//! │  └────────────┘   └────────────┘   └────────────┘   └──────────┘ │
//! │        ▲                                                  │      │
//! │        │                                                  ▼      │
//! │  ┌────────────┐                                   ┌────────────┐ │
//! │  │ Frame Feed │                                   │ Dispatcher │ │
//! │  └────────────┘                                   └────────────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use squat_coach::{coach, pose, stats, Config, SquatSession};
//!
//! let sink = Arc::new(coach::MemorySink::new());
//! let dispatcher = coach::CoachingDispatcher::new(sink.clone(), stats::create_shared_log());
//! let mut session = SquatSession::new(&Config::default(), dispatcher);
//!
//! for frame in pose::SquatSynth::new(30.0).reps(3) {
//!     let report = session.process_frame(&frame);
//!     if let Some(event) = report.rep_event() {
//!         println!("rep {} at {}ms", event.sequence, event.completed_at_ms);
//!     }
//! }
//! ```

pub mod coach;
pub mod config;
pub mod core;
pub mod pose;
pub mod stats;

// Re-export key types at crate root for convenience
pub use coach::{AdviceProvider, CoachingDispatcher, CoachingSink, RealtimeCoach};
pub use config::{Config, ConfigError};
pub use core::{
    joint_angle, Diagnostic, FeedbackMessage, FeedbackSource, FrameReport, RepEvent,
    SquatMachine, SquatSession, SquatState, VisibilityGate,
};
pub use pose::{Frame, FrameFeed, Landmark};
pub use stats::{SessionLog, SessionStats, SharedSessionLog};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Setup advice shown before a session starts.
pub const SETUP_TIPS: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                     SQUAT COACH - SETUP TIPS                     ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  ✓ Make sure your full body is visible                           ║
║  ✓ Stand side-on or facing the camera, hips to ankles in frame   ║
║  ✓ Squat until your knees pass 110° for a rep to count           ║
║  ✓ Stand all the way up (150°+) to complete the rep              ║
║                                                                  ║
║  Frames where hips, knees or ankles are hidden are skipped.      ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
