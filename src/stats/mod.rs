//! Session statistics.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, load_persisted, SessionLog,
    SessionStats, SharedSessionLog,
};
