//! Session statistics.
//!
//! Counters are atomic so the dispatcher's advice tasks can record outcomes
//! while the frame loop keeps running.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Running statistics for one workout session.
#[derive(Debug)]
pub struct SessionLog {
    frames_processed: AtomicU64,
    frames_blocked: AtomicU64,
    frames_stale: AtomicU64,
    depth_reached: AtomicU64,
    reps_counted: AtomicU64,
    feedback_delivered: AtomicU64,
    advice_requested: AtomicU64,
    advice_failed: AtomicU64,
    advice_discarded: AtomicU64,
    /// Completion timestamps of counted reps, for tempo statistics
    rep_times_ms: Mutex<Vec<u64>>,
    session_start: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl SessionLog {
    /// A log without persistence.
    pub fn new() -> Self {
        Self {
            frames_processed: AtomicU64::new(0),
            frames_blocked: AtomicU64::new(0),
            frames_stale: AtomicU64::new(0),
            depth_reached: AtomicU64::new(0),
            reps_counted: AtomicU64::new(0),
            feedback_delivered: AtomicU64::new(0),
            advice_requested: AtomicU64::new(0),
            advice_failed: AtomicU64::new(0),
            advice_discarded: AtomicU64::new(0),
            rep_times_ms: Mutex::new(Vec::new()),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// A log that [`save`](Self::save)s to `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);
        log
    }

    /// Record a frame handed to the session.
    pub fn record_frame(&self) {
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame rejected by the visibility gate.
    pub fn record_blocked_frame(&self) {
        self.frames_blocked.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an out-of-order frame.
    pub fn record_stale_frame(&self) {
        self.frames_stale.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a depth transition.
    pub fn record_depth(&self) {
        self.depth_reached.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed rep and its timestamp.
    pub fn record_rep(&self, completed_at_ms: u64) {
        self.reps_counted.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut times) = self.rep_times_ms.lock() {
            times.push(completed_at_ms);
        }
    }

    /// Record a message delivered to the sink.
    pub fn record_feedback(&self) {
        self.feedback_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an advice request.
    pub fn record_advice_requested(&self) {
        self.advice_requested.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an advice request that fell back to a canned phrase.
    pub fn record_advice_failed(&self) {
        self.advice_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// An advice response arrived after the session stopped.
    pub fn record_advice_discarded(&self) {
        self.advice_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of all counters and tempo statistics.
    pub fn stats(&self) -> SessionStats {
        let tempo = self.tempo();
        SessionStats {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            frames_blocked: self.frames_blocked.load(Ordering::Relaxed),
            frames_stale: self.frames_stale.load(Ordering::Relaxed),
            depth_reached: self.depth_reached.load(Ordering::Relaxed),
            reps_counted: self.reps_counted.load(Ordering::Relaxed),
            feedback_delivered: self.feedback_delivered.load(Ordering::Relaxed),
            advice_requested: self.advice_requested.load(Ordering::Relaxed),
            advice_failed: self.advice_failed.load(Ordering::Relaxed),
            advice_discarded: self.advice_discarded.load(Ordering::Relaxed),
            mean_rep_interval_ms: tempo.map(|t| t.0),
            rep_interval_std_dev_ms: tempo.and_then(|t| t.1),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Mean and standard deviation of the time between consecutive reps.
    fn tempo(&self) -> Option<(f64, Option<f64>)> {
        let times = self.rep_times_ms.lock().ok()?;
        let intervals: Vec<f64> = times
            .windows(2)
            .map(|w| w[1].saturating_sub(w[0]) as f64)
            .collect();
        if intervals.is_empty() {
            return None;
        }
        let mean = intervals.iter().mean();
        let std_dev = if intervals.len() > 1 {
            Some(intervals.iter().std_dev())
        } else {
            None
        };
        Some((mean, std_dev))
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        self.stats().summary()
    }

    /// Write the current stats as JSON, if this log has a path.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let persisted = PersistedStats {
                stats: self.stats(),
                last_updated: Utc::now(),
            };
            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Reset every counter and the tempo history.
    pub fn reset(&self) {
        for counter in [
            &self.frames_processed,
            &self.frames_blocked,
            &self.frames_stale,
            &self.depth_reached,
            &self.reps_counted,
            &self.feedback_delivered,
            &self.advice_requested,
            &self.advice_failed,
            &self.advice_discarded,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        if let Ok(mut times) = self.rep_times_ms.lock() {
            times.clear();
        }
    }
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of session statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub frames_processed: u64,
    pub frames_blocked: u64,
    pub frames_stale: u64,
    pub depth_reached: u64,
    pub reps_counted: u64,
    pub feedback_delivered: u64,
    pub advice_requested: u64,
    pub advice_failed: u64,
    pub advice_discarded: u64,
    pub mean_rep_interval_ms: Option<f64>,
    pub rep_interval_std_dev_ms: Option<f64>,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

impl SessionStats {
    /// Human-readable multi-line summary.
    pub fn summary(&self) -> String {
        let tempo = match (self.mean_rep_interval_ms, self.rep_interval_std_dev_ms) {
            (Some(mean), Some(sd)) => format!("{:.2}s ± {:.2}s", mean / 1000.0, sd / 1000.0),
            (Some(mean), None) => format!("{:.2}s", mean / 1000.0),
            _ => "n/a".to_string(),
        };
        format!(
            "Session Statistics:\n\
             - Frames processed: {}\n\
             - Frames skipped (body not visible): {}\n\
             - Frames skipped (out of order): {}\n\
             - Depth reached: {}\n\
             - Reps counted: {}\n\
             - Rep tempo: {}\n\
             - Feedback delivered: {}\n\
             - Advice requests: {} ({} fell back, {} discarded)\n\
             - Session duration: {} seconds",
            self.frames_processed,
            self.frames_blocked,
            self.frames_stale,
            self.depth_reached,
            self.reps_counted,
            tempo,
            self.feedback_delivered,
            self.advice_requested,
            self.advice_failed,
            self.advice_discarded,
            self.session_duration_secs
        )
    }
}

/// Stats format on disk.
#[derive(Debug, Serialize, Deserialize)]
pub struct PersistedStats {
    pub stats: SessionStats,
    pub last_updated: DateTime<Utc>,
}

/// Load the last persisted stats from `path`.
pub fn load_persisted(path: &std::path::Path) -> Result<PersistedStats, std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(std::io::Error::other)
}

/// Thread-safe shared session log.
pub type SharedSessionLog = Arc<SessionLog>;

/// Create a shared log without persistence.
pub fn create_shared_log() -> SharedSessionLog {
    Arc::new(SessionLog::new())
}

/// Create a shared log saved to `path`.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedSessionLog {
    Arc::new(SessionLog::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let log = SessionLog::new();
        log.record_frame();
        log.record_frame();
        log.record_blocked_frame();
        log.record_rep(1_000);

        let stats = log.stats();
        assert_eq!(stats.frames_processed, 2);
        assert_eq!(stats.frames_blocked, 1);
        assert_eq!(stats.reps_counted, 1);
    }

    #[test]
    fn test_tempo() {
        let log = SessionLog::new();
        log.record_rep(1_000);
        assert_eq!(log.stats().mean_rep_interval_ms, None);

        log.record_rep(3_000);
        log.record_rep(7_000);
        let stats = log.stats();
        assert_eq!(stats.mean_rep_interval_ms, Some(3_000.0));
        let sd = stats.rep_interval_std_dev_ms.unwrap();
        // Sample standard deviation of [2000, 4000].
        assert!((sd - 1_414.213_562).abs() < 1e-3);
    }

    #[test]
    fn test_reset() {
        let log = SessionLog::new();
        log.record_rep(1_000);
        log.record_rep(2_000);
        log.record_advice_failed();
        log.reset();

        let stats = log.stats();
        assert_eq!(stats.reps_counted, 0);
        assert_eq!(stats.advice_failed, 0);
        assert_eq!(stats.mean_rep_interval_ms, None);
    }

    #[test]
    fn test_summary_format() {
        let summary = SessionLog::new().summary();
        assert!(summary.contains("Reps counted"));
        assert!(summary.contains("Rep tempo: n/a"));
    }

    #[test]
    fn test_persistence_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("squat-coach-log-{}", uuid::Uuid::new_v4()))
            .join("stats.json");
        let log = SessionLog::with_persistence(path.clone());
        log.record_rep(500);
        log.save().unwrap();

        let loaded = load_persisted(&path).unwrap();
        assert_eq!(loaded.stats.reps_counted, 1);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
