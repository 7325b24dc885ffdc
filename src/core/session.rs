//! One workout session: frames in, reps and feedback out.
//!
//! The session owns every piece of mutable state (machine, timers, counter,
//! phrase RNG). `process_frame` takes `&mut self`, so exactly one caller can
//! advance it; hosts with overlapping frame callbacks push into a
//! [`FrameFeed`](crate::pose::FrameFeed) and drain it from the owner.

use crate::coach::{CoachUpdate, CoachingDispatcher};
use crate::config::{Config, JointConfig};
use crate::core::angle::knee_angles;
use crate::core::feedback::{FeedbackDecision, FeedbackMessage, FeedbackSelector};
use crate::core::state_machine::{
    Direction, MachineSettings, RepEvent, SquatMachine, SquatState, Transition,
};
use crate::core::visibility::{BlockReason, GateOutcome, VisibilityGate};
use crate::pose::types::Frame;
use crate::stats::SharedSessionLog;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Status text for the current frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    BodyNotVisible(BlockReason),
    /// Timestamp earlier than an already processed frame
    OutOfOrder { timestamp_ms: u64, last_ms: u64 },
    /// The session was stopped
    Inactive,
    Tracking {
        angle: f64,
        state: SquatState,
        direction: Option<Direction>,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::BodyNotVisible(_) => write!(f, "Step back! Full body not visible"),
            Diagnostic::OutOfOrder { .. } => write!(f, "Frame out of order, skipped"),
            Diagnostic::Inactive => write!(f, "Session stopped"),
            Diagnostic::Tracking {
                angle,
                state,
                direction,
            } => {
                write!(f, "Angle: {}° | State: {state}", angle.round())?;
                match direction {
                    Some(Direction::Bending) => write!(f, " (bending)"),
                    Some(Direction::Extending) => write!(f, " (extending)"),
                    None => Ok(()),
                }
            }
        }
    }
}

/// What happened while processing one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub timestamp_ms: u64,
    pub diagnostic: Diagnostic,
    /// Averaged joint angle, when the frame was analyzed
    pub angle: Option<f64>,
    pub transition: Option<Transition>,
    /// Feedback delivered synchronously for this frame
    pub feedback: Option<FeedbackMessage>,
    /// The rep was claimed by an async advice request
    pub advice_claimed: bool,
    /// Running rep total after this frame
    pub rep_count: u32,
}

impl FrameReport {
    /// The rep completed on this frame, if any.
    pub fn rep_event(&self) -> Option<RepEvent> {
        match self.transition {
            Some(Transition::RepCompleted(event)) => Some(event),
            _ => None,
        }
    }

    /// Whether the frame passed the gate and produced an angle.
    pub fn is_analyzed(&self) -> bool {
        self.angle.is_some()
    }
}

/// A single subject's workout.
pub struct SquatSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    machine: SquatMachine,
    settings: MachineSettings,
    joints: JointConfig,
    gate: VisibilityGate,
    selector: FeedbackSelector,
    dispatcher: CoachingDispatcher,
    log: SharedSessionLog,
    advice_enabled: bool,
    status_interval_ms: u64,
    last_status_ms: Option<u64>,
    last_frame_ms: Option<u64>,
    active: bool,
}

impl SquatSession {
    /// Start a session from configuration, routing feedback through `dispatcher`.
    pub fn new(config: &Config, dispatcher: CoachingDispatcher) -> Self {
        let selector = match config.seed {
            Some(seed) => FeedbackSelector::with_seed(config.feedback_policy(), seed),
            None => FeedbackSelector::new(config.feedback_policy()),
        };
        let log = dispatcher.log().clone();
        let id = Uuid::new_v4();

        info!(session = %id, "session started");

        Self {
            id,
            started_at: Utc::now(),
            machine: SquatMachine::new(),
            settings: config.machine_settings(),
            joints: config.joints.clone(),
            gate: config.visibility_gate(),
            selector,
            dispatcher,
            log,
            advice_enabled: config.coaching.advice_enabled,
            status_interval_ms: config.coaching.status_interval.as_millis() as u64,
            last_status_ms: None,
            last_frame_ms: None,
            active: true,
        }
    }

    /// Unique id of this session.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wall-clock time the session was created.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Reps counted so far.
    pub fn rep_count(&self) -> u32 {
        self.machine.rep_count
    }

    /// State reported for the last analyzed frame.
    pub fn state(&self) -> SquatState {
        self.machine.state
    }

    /// Snapshot of the state machine.
    pub fn machine(&self) -> &SquatMachine {
        &self.machine
    }

    /// Counters shared with the dispatcher.
    pub fn log(&self) -> &SharedSessionLog {
        &self.log
    }

    /// Collaborator routing for this session.
    pub fn dispatcher(&self) -> &CoachingDispatcher {
        &self.dispatcher
    }

    /// `false` once [`stop`](Self::stop) was called.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether reps may be claimed for advice: switched on in the
    /// configuration and routed to a provider by the dispatcher.
    pub fn advice_enabled(&self) -> bool {
        self.advice_enabled && self.dispatcher.advice_enabled()
    }

    /// Process one frame. Never blocks and never fails; problems with the
    /// input surface as a [`Diagnostic`].
    pub fn process_frame(&mut self, frame: &Frame) -> FrameReport {
        let now = frame.timestamp_ms;

        if !self.active {
            return self.report(now, Diagnostic::Inactive, None);
        }

        self.log.record_frame();

        if let Some(last) = self.last_frame_ms {
            if now < last {
                warn!(timestamp_ms = now, last_ms = last, "frame out of order, skipped");
                self.log.record_stale_frame();
                let diagnostic = Diagnostic::OutOfOrder {
                    timestamp_ms: now,
                    last_ms: last,
                };
                return self.report(now, diagnostic, None);
            }
        }
        self.last_frame_ms = Some(now);
        self.tick_status(now);

        if let GateOutcome::Blocked(reason) = self.gate.check(frame) {
            debug!(timestamp_ms = now, %reason, "frame blocked");
            self.log.record_blocked_frame();
            return self.report(now, Diagnostic::BodyNotVisible(reason), None);
        }

        let Some(angles) = knee_angles(frame, &self.joints) else {
            self.log.record_blocked_frame();
            let reason = BlockReason::Missing { joints: Vec::new() };
            return self.report(now, Diagnostic::BodyNotVisible(reason), None);
        };
        let angle = angles.mean();

        let step = self.machine.apply(&self.settings, angle, now);
        let mut report = self.report(
            now,
            Diagnostic::Tracking {
                angle,
                state: step.state,
                direction: step.direction,
            },
            Some(angle),
        );
        report.transition = step.transition;

        match step.transition {
            Some(Transition::DepthReached { .. }) => {
                self.log.record_depth();
                if self.dispatcher.realtime_active() {
                    self.dispatcher.push_update(CoachUpdate::DepthReached);
                } else {
                    let message = FeedbackMessage::depth_cue();
                    self.dispatcher.deliver(message.clone());
                    report.feedback = Some(message);
                }
            }
            Some(Transition::RepCompleted(event)) => {
                self.log.record_rep(event.completed_at_ms);
                info!(session = %self.id, rep = event.sequence, "rep completed");

                if self.dispatcher.realtime_active() {
                    self.dispatcher.push_update(CoachUpdate::RepCompleted {
                        count: event.sequence,
                    });
                }

                match self
                    .selector
                    .select(event.sequence, self.advice_enabled())
                {
                    FeedbackDecision::Immediate(message) => {
                        self.dispatcher.deliver(message.clone());
                        report.feedback = Some(message);
                    }
                    FeedbackDecision::ClaimAdvice { .. } => {
                        self.dispatcher.request_advice(event);
                        report.advice_claimed = true;
                    }
                }
            }
            None => {}
        }

        report.rep_count = self.machine.rep_count;
        report
    }

    /// Push a status update to the real-time coach every `status_interval`
    /// of frame time, once at least one rep is counted.
    fn tick_status(&mut self, now: u64) {
        if self.machine.rep_count == 0 || !self.dispatcher.realtime_active() {
            return;
        }
        let due = self
            .last_status_ms
            .map_or(true, |last| now.saturating_sub(last) >= self.status_interval_ms);
        if due {
            self.dispatcher.push_update(CoachUpdate::Status {
                count: self.machine.rep_count,
                state: self.machine.state,
            });
            self.last_status_ms = Some(now);
        }
    }

    fn report(&self, timestamp_ms: u64, diagnostic: Diagnostic, angle: Option<f64>) -> FrameReport {
        FrameReport {
            timestamp_ms,
            diagnostic,
            angle,
            transition: None,
            feedback: None,
            advice_claimed: false,
            rep_count: self.machine.rep_count,
        }
    }

    /// Stop the session. Outstanding advice responses will be discarded.
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.dispatcher.close();
        info!(session = %self.id, reps = self.machine.rep_count, "session stopped");
    }

    /// Wait for in-flight advice requests to settle.
    pub async fn flush_advice(&self) {
        self.dispatcher.flush().await;
    }
}
