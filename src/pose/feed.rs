//! Frame feed between pose producers and the single session owner.
//!
//! Producers (camera callbacks, replay readers) may overlap; they push into
//! a bounded queue and exactly one consumer drains it, so state machine
//! mutation never happens from two paths at once.

use crate::pose::types::Frame;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default number of frames buffered before producers see `FeedError::Full`.
pub const DEFAULT_FEED_CAPACITY: usize = 1_024;

/// Errors returned to frame producers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    AlreadyRunning,
    /// The feed is stopped; the frame was dropped
    Stopped,
    /// The consumer is behind; the frame was dropped
    Full,
    /// The consumer side no longer exists
    Disconnected,
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::AlreadyRunning => write!(f, "Frame feed is already running"),
            FeedError::Stopped => write!(f, "Frame feed is stopped"),
            FeedError::Full => write!(f, "Frame feed is full"),
            FeedError::Disconnected => write!(f, "Frame feed consumer disconnected"),
        }
    }
}

impl std::error::Error for FeedError {}

/// Cloneable producer side of a [`FrameFeed`].
#[derive(Clone)]
pub struct FeedHandle {
    sender: Sender<Frame>,
    running: Arc<AtomicBool>,
}

impl FeedHandle {
    /// Push a frame without blocking.
    pub fn push(&self, frame: Frame) -> Result<(), FeedError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(FeedError::Stopped);
        }
        self.sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => FeedError::Full,
            TrySendError::Disconnected(_) => FeedError::Disconnected,
        })
    }

    /// Push a frame, waiting for room in the queue.
    pub fn push_blocking(&self, frame: Frame) -> Result<(), FeedError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(FeedError::Stopped);
        }
        self.sender
            .send(frame)
            .map_err(|_| FeedError::Disconnected)
    }

    /// Whether the feed still accepts frames.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Result of [`FrameFeed::poll`].
#[derive(Debug)]
pub enum FeedPoll {
    Frame(Frame),
    /// Nothing arrived yet but producers are still running
    Idle,
    /// Producers are done and the queue is empty
    Finished,
}

/// Bounded single-consumer frame queue.
pub struct FrameFeed {
    sender: Sender<Frame>,
    receiver: Receiver<Frame>,
    running: Arc<AtomicBool>,
}

impl FrameFeed {
    /// A stopped feed buffering up to `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start accepting frames.
    pub fn start(&mut self) -> Result<(), FeedError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(FeedError::AlreadyRunning);
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Stop accepting frames. Frames already queued stay readable.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether producers may push.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// A producer handle sharing this feed's running flag.
    pub fn handle(&self) -> FeedHandle {
        FeedHandle {
            sender: self.sender.clone(),
            running: self.running.clone(),
        }
    }

    /// Raw receiver, for use with `crossbeam_channel::select!`.
    pub fn receiver(&self) -> &Receiver<Frame> {
        &self.receiver
    }

    /// Try to receive a frame without blocking.
    pub fn try_recv(&self) -> Option<Frame> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for the next frame.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Frame, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Wait up to `timeout` for the next frame, then ask `producers_done`.
    ///
    /// Once producers report done the queue is checked again, so a frame
    /// pushed right before a producer exits is still returned.
    pub fn poll(&self, timeout: Duration, producers_done: impl FnOnce() -> bool) -> FeedPoll {
        match self.receiver.recv_timeout(timeout) {
            Ok(frame) => FeedPoll::Frame(frame),
            Err(RecvTimeoutError::Timeout) => {
                if !producers_done() {
                    return FeedPoll::Idle;
                }
                match self.receiver.try_recv() {
                    Ok(frame) => FeedPoll::Frame(frame),
                    Err(_) => FeedPoll::Finished,
                }
            }
            Err(RecvTimeoutError::Disconnected) => FeedPoll::Finished,
        }
    }

    /// Discard everything currently queued, returning how many frames were dropped.
    pub fn drain(&self) -> usize {
        let mut dropped = 0;
        while self.receiver.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}

impl Default for FrameFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}
