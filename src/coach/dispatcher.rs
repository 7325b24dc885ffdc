//! Routes feedback to collaborators and runs advice requests.
//!
//! Advice requests are spawned on a tokio runtime and never awaited by the
//! frame loop. Each response is tagged with its originating rep. Closing the
//! dispatcher detaches the sink and aborts requests still in flight; each one
//! is counted as discarded exactly once.

use crate::coach::{AdviceError, AdviceProvider, CoachUpdate, CoachingSink, RealtimeCoach};
use crate::core::feedback::{pick_canned, FeedbackMessage, FeedbackSource};
use crate::core::state_machine::RepEvent;
use crate::stats::SharedSessionLog;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default upper bound for one advice request.
pub const DEFAULT_ADVICE_TIMEOUT: Duration = Duration::from_secs(5);

type SinkSlot = Arc<RwLock<Option<Arc<dyn CoachingSink>>>>;

struct AdviceRoute {
    provider: Arc<dyn AdviceProvider>,
    timeout: Duration,
    runtime: Handle,
}

/// A spawned advice request. `settled` is claimed by whoever finishes it
/// first: the task delivering, or `close` aborting.
struct PendingAdvice {
    rep: u32,
    handle: JoinHandle<()>,
    settled: Arc<AtomicBool>,
}

/// Per-session router between the core and its collaborators.
pub struct CoachingDispatcher {
    sink: SinkSlot,
    advice: Option<AdviceRoute>,
    realtime: Option<Arc<dyn RealtimeCoach>>,
    log: SharedSessionLog,
    pending: Mutex<Vec<PendingAdvice>>,
}

impl CoachingDispatcher {
    /// Route feedback to `sink`, recording deliveries in `log`.
    pub fn new(sink: Arc<dyn CoachingSink>, log: SharedSessionLog) -> Self {
        Self {
            sink: Arc::new(RwLock::new(Some(sink))),
            advice: None,
            realtime: None,
            log,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Enable async advice, spawned on `runtime` and bounded by `timeout`.
    pub fn with_advice(
        mut self,
        provider: Arc<dyn AdviceProvider>,
        timeout: Duration,
        runtime: Handle,
    ) -> Self {
        self.advice = Some(AdviceRoute {
            provider,
            timeout,
            runtime,
        });
        self
    }

    /// Attach a real-time coach for depth, rep and status updates.
    pub fn with_realtime(mut self, coach: Arc<dyn RealtimeCoach>) -> Self {
        self.realtime = Some(coach);
        self
    }

    /// Counters updated by deliveries and advice outcomes.
    pub fn log(&self) -> &SharedSessionLog {
        &self.log
    }

    /// `false` once [`close`](Self::close) was called.
    pub fn is_open(&self) -> bool {
        self.sink.read().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Whether reps may be claimed by an advice request.
    pub fn advice_enabled(&self) -> bool {
        self.advice.is_some() && self.is_open()
    }

    /// Whether a real-time coach is connected and unobstructed.
    pub fn realtime_active(&self) -> bool {
        self.is_open() && self.realtime.as_ref().is_some_and(|c| c.is_active())
    }

    /// Hand a message to the sink. Returns `false` once closed.
    pub fn deliver(&self, message: FeedbackMessage) -> bool {
        deliver_to(&self.sink, &self.log, message)
    }

    /// Push an update to the real-time coach if it is active.
    pub fn push_update(&self, update: CoachUpdate) -> bool {
        match &self.realtime {
            Some(coach) if self.is_open() && coach.is_active() => {
                coach.push_update(update);
                true
            }
            _ => false,
        }
    }

    /// Request advice for a claimed rep without blocking.
    ///
    /// Without an advice route the canned fallback is delivered immediately.
    pub fn request_advice(&self, event: RepEvent) {
        let rep = event.sequence;
        self.log.record_advice_requested();

        let Some(route) = &self.advice else {
            report_failure(&self.log, rep, &AdviceError::Disabled);
            self.deliver(fallback_message(rep));
            return;
        };

        let provider = route.provider.clone();
        let timeout = route.timeout;
        let sink = self.sink.clone();
        let log = self.log.clone();
        let settled = Arc::new(AtomicBool::new(false));
        let task_settled = settled.clone();

        let handle = route.runtime.spawn(async move {
            let outcome = tokio::time::timeout(timeout, provider.request(rep)).await;
            let message = match outcome {
                Ok(Ok(text)) if !text.trim().is_empty() => {
                    FeedbackMessage::new(text.trim(), FeedbackSource::AiCoach, Some(rep))
                }
                Ok(Ok(_)) => {
                    report_failure(&log, rep, &AdviceError::InvalidResponse("empty".into()));
                    fallback_message(rep)
                }
                Ok(Err(e)) => {
                    report_failure(&log, rep, &e);
                    fallback_message(rep)
                }
                Err(_) => {
                    warn!(rep, ?timeout, "advice request timed out, using canned phrase");
                    log.record_advice_failed();
                    fallback_message(rep)
                }
            };

            if task_settled.swap(true, Ordering::SeqCst) {
                return;
            }
            if !deliver_to(&sink, &log, message) {
                debug!(rep, "advice arrived after session stopped, discarded");
                log.record_advice_discarded();
            }
        });

        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|p| !p.handle.is_finished());
            pending.push(PendingAdvice {
                rep,
                handle,
                settled,
            });
        }
    }

    /// Number of advice requests still running.
    pub fn outstanding(&self) -> usize {
        self.pending
            .lock()
            .map(|p| p.iter().filter(|a| !a.handle.is_finished()).count())
            .unwrap_or(0)
    }

    /// Wait for every outstanding advice request to finish.
    pub async fn flush(&self) {
        let handles = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => return,
        };
        for advice in handles {
            if let Err(e) = advice.handle.await {
                warn!(error = %e, "advice task ended abnormally");
            }
        }
    }

    /// Detach the sink and abort advice still in flight. Later deliveries
    /// are dropped.
    pub fn close(&self) {
        if let Ok(mut slot) = self.sink.write() {
            *slot = None;
        }

        let pending = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => return,
        };
        for advice in pending {
            if !advice.settled.swap(true, Ordering::SeqCst) {
                advice.handle.abort();
                debug!(rep = advice.rep, "advice request aborted");
                self.log.record_advice_discarded();
            }
        }
    }
}

fn deliver_to(sink: &SinkSlot, log: &SharedSessionLog, message: FeedbackMessage) -> bool {
    let Ok(slot) = sink.read() else {
        return false;
    };
    match slot.as_ref() {
        Some(sink) => {
            sink.accept(message);
            log.record_feedback();
            true
        }
        None => false,
    }
}

fn report_failure(log: &SharedSessionLog, rep: u32, error: &AdviceError) {
    warn!(rep, error = %error, "advice unavailable, using canned phrase");
    log.record_advice_failed();
}

fn fallback_message(rep: u32) -> FeedbackMessage {
    let phrase = pick_canned(&mut rand::thread_rng());
    FeedbackMessage::canned(phrase, rep, FeedbackSource::Fallback)
}
