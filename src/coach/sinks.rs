//! Ready-made sinks and coaches.

use crate::coach::{CoachUpdate, CoachingSink, RealtimeCoach};
use crate::core::feedback::FeedbackMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Prints feedback to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl CoachingSink for ConsoleSink {
    fn accept(&self, message: FeedbackMessage) {
        match message.rep {
            Some(rep) => println!("  [{}] rep {rep}: {}", message.source, message.text),
            None => println!("  [{}] {}", message.source, message.text),
        }
    }
}

/// Collects feedback in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<FeedbackMessage>>,
}

impl MemorySink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything received so far.
    pub fn messages(&self) -> Vec<FeedbackMessage> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Number of messages received.
    pub fn len(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or(0)
    }

    /// Whether no message was received yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CoachingSink for MemorySink {
    fn accept(&self, message: FeedbackMessage) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message);
        }
    }
}

/// Real-time coach that prints updates; can be marked obstructed.
#[derive(Debug)]
pub struct ConsoleCoach {
    active: AtomicBool,
}

impl ConsoleCoach {
    /// A console coach, active from the start.
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(true),
        }
    }

    /// Mark the coach connected or obstructed.
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }
}

impl Default for ConsoleCoach {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeCoach for ConsoleCoach {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn push_update(&self, update: CoachUpdate) {
        println!("  [coach] {}", update.text());
    }
}

/// Real-time coach that records updates in memory.
#[derive(Debug)]
pub struct MemoryCoach {
    active: AtomicBool,
    updates: Mutex<Vec<CoachUpdate>>,
}

impl MemoryCoach {
    /// A recording coach in the given activity state.
    pub fn new(active: bool) -> Self {
        Self {
            active: AtomicBool::new(active),
            updates: Mutex::new(Vec::new()),
        }
    }

    /// Mark the coach connected or obstructed.
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Updates received so far, oldest first.
    pub fn updates(&self) -> Vec<CoachUpdate> {
        self.updates
            .lock()
            .map(|u| u.clone())
            .unwrap_or_default()
    }
}

impl RealtimeCoach for MemoryCoach {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn push_update(&self, update: CoachUpdate) {
        if let Ok(mut updates) = self.updates.lock() {
            updates.push(update);
        }
    }
}
