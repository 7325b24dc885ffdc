//! Feedback selection for completed reps and depth cues.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Phrases used when no milestone or advice applies.
pub const CANNED_PHRASES: [&str; 5] = ["Nice!", "Strong!", "Keep it up!", "Power!", "Great!"];

/// Spoken when squat depth is reached.
pub const DEPTH_CUE: &str = "Good depth! Push up!";

/// Where a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedbackSource {
    Milestone,
    AiCoach,
    Canned,
    /// Canned phrase standing in for a failed advice request
    Fallback,
}

impl FeedbackSource {
    /// Stable name used in logs and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackSource::Milestone => "milestone",
            FeedbackSource::AiCoach => "ai-coach",
            FeedbackSource::Canned => "canned",
            FeedbackSource::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for FeedbackSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A piece of coaching text on its way to a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackMessage {
    pub text: String,
    pub source: FeedbackSource,
    /// Rep this message belongs to; `None` for depth cues
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rep: Option<u32>,
}

impl FeedbackMessage {
    /// Build a message with an explicit source.
    pub fn new(text: impl Into<String>, source: FeedbackSource, rep: Option<u32>) -> Self {
        Self {
            text: text.into(),
            source,
            rep,
        }
    }

    /// Cue sent when the bottom of a squat is reached.
    pub fn depth_cue() -> Self {
        Self::new(DEPTH_CUE, FeedbackSource::Canned, None)
    }

    /// Celebration for every milestone rep.
    pub fn milestone(count: u32) -> Self {
        Self::new(
            format!("{count} reps! Milestone reached, keep going!"),
            FeedbackSource::Milestone,
            Some(count),
        )
    }

    /// Canned phrase with the running total.
    pub fn canned(phrase: &str, count: u32, source: FeedbackSource) -> Self {
        Self::new(format!("{phrase} Total: {count}"), source, Some(count))
    }
}

/// Intervals driving the selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackPolicy {
    /// Milestone message every this many reps
    pub milestone_every: u32,
    /// Advice request every this many reps (when a provider is enabled)
    pub advice_every: u32,
}

impl Default for FeedbackPolicy {
    fn default() -> Self {
        Self {
            milestone_every: 5,
            advice_every: 3,
        }
    }
}

/// Outcome of selecting feedback for one rep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackDecision {
    /// Deliver this message now
    Immediate(FeedbackMessage),
    /// The rep is claimed by an async advice request; emit nothing now
    ClaimAdvice { rep: u32 },
}

/// Applies [`FeedbackPolicy`] and picks canned phrases.
pub struct FeedbackSelector {
    policy: FeedbackPolicy,
    rng: StdRng,
}

impl FeedbackSelector {
    /// Selector with an entropy-seeded phrase RNG.
    pub fn new(policy: FeedbackPolicy) -> Self {
        Self {
            policy,
            rng: StdRng::from_entropy(),
        }
    }

    /// Selector with a reproducible phrase sequence.
    pub fn with_seed(policy: FeedbackPolicy, seed: u64) -> Self {
        Self {
            policy,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Intervals in use.
    pub fn policy(&self) -> &FeedbackPolicy {
        &self.policy
    }

    /// Select feedback for rep `count`. First match wins: milestone,
    /// advice claim (only when `advice_enabled`), canned phrase.
    pub fn select(&mut self, count: u32, advice_enabled: bool) -> FeedbackDecision {
        if is_multiple(count, self.policy.milestone_every) {
            return FeedbackDecision::Immediate(FeedbackMessage::milestone(count));
        }
        if advice_enabled && is_multiple(count, self.policy.advice_every) {
            return FeedbackDecision::ClaimAdvice { rep: count };
        }
        let phrase = self.pick_phrase();
        FeedbackDecision::Immediate(FeedbackMessage::canned(phrase, count, FeedbackSource::Canned))
    }

    /// Uniformly random canned phrase.
    pub fn pick_phrase(&mut self) -> &'static str {
        pick_canned(&mut self.rng)
    }
}

impl Default for FeedbackSelector {
    fn default() -> Self {
        Self::new(FeedbackPolicy::default())
    }
}

/// Uniformly random canned phrase from any RNG.
pub fn pick_canned<R: rand::Rng + ?Sized>(rng: &mut R) -> &'static str {
    CANNED_PHRASES.choose(rng).copied().unwrap_or(CANNED_PHRASES[0])
}

fn is_multiple(count: u32, every: u32) -> bool {
    every > 0 && count > 0 && count % every == 0
}
