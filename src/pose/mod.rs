//! Pose input: landmark types, the frame feed, recordings and synthetic streams.

pub mod feed;
pub mod replay;
pub mod synthetic;
pub mod types;

// Re-export commonly used types
pub use feed::{FeedError, FeedHandle, FeedPoll, FrameFeed};
pub use replay::{read_frames, write_frames, FrameReader, ReplayError};
pub use synthetic::SquatSynth;
pub use types::{Frame, JointTriple, Landmark};
