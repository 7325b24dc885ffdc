//! Offline advice provider.

use crate::coach::{AdviceError, AdviceFuture, AdviceProvider};
use rand::seq::SliceRandom;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Tips used when no remote assistant is configured.
pub const TIPS: [&str; 3] = ["Keep pushing!", "Great form!", "Stay strong!"];

/// Returns a random tip after an optional delay, no network involved.
#[derive(Debug)]
pub struct TipAdvisor {
    delay: Duration,
    enabled: AtomicBool,
}

impl TipAdvisor {
    /// An enabled advisor that answers immediately.
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
            enabled: AtomicBool::new(true),
        }
    }

    /// Simulate provider latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// A disabled advisor answers every request with [`AdviceError::Disabled`].
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl Default for TipAdvisor {
    fn default() -> Self {
        Self::new()
    }
}

impl AdviceProvider for TipAdvisor {
    fn request(&self, rep_count: u32) -> AdviceFuture<'_> {
        let enabled = self.enabled.load(Ordering::SeqCst);
        let tip = TIPS.choose(&mut rand::thread_rng()).copied().unwrap_or(TIPS[0]);
        let delay = self.delay;

        Box::pin(async move {
            if !enabled {
                return Err(AdviceError::Disabled);
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(format!("Rep {rep_count}: {tip}"))
        })
    }
}
