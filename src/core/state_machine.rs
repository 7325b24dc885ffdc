//! Squat rep-detection state machine.
//!
//! A Mealy machine over the averaged knee angle. It keeps a committed phase
//! (`Up` or `Down`) apart from the reported [`SquatState`], so drifting
//! through the band between the thresholds is informational only and never
//! blocks counting.
//!
//! Rules, first match wins:
//!
//! 1. `angle <= down`, committed `Up`, debounce elapsed since the last
//!    down entry: commit `Down`, emit [`Transition::DepthReached`].
//! 2. `angle >= up`, committed `Down`, debounce elapsed since the last
//!    completed rep: commit `Up`, emit [`Transition::RepCompleted`].
//! 3. `down < angle < up`: report `Transitioning`.
//! 4. otherwise: report the committed phase.
//!
//! Thresholds are inclusive, the band is strict, and the debounce interval
//! must be strictly exceeded. All timing comes from frame timestamps.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default knee angle at or below which squat depth is reached.
pub const DEFAULT_DOWN_THRESHOLD: f64 = 110.0;
/// Default knee angle at or above which the subject is standing.
pub const DEFAULT_UP_THRESHOLD: f64 = 150.0;
/// Default minimum time between two transitions of the same kind.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1_000;

/// Reported squat state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SquatState {
    Up,
    Down,
    Transitioning,
}

impl SquatState {
    /// Lowercase label shown in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            SquatState::Up => "up",
            SquatState::Down => "down",
            SquatState::Transitioning => "transitioning",
        }
    }
}

impl std::fmt::Display for SquatState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last phase the machine committed to by crossing a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Up,
    Down,
}

impl From<Phase> for SquatState {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Up => SquatState::Up,
            Phase::Down => SquatState::Down,
        }
    }
}

/// Movement direction while between thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Left standing, heading for depth
    Bending,
    /// Left the bottom, heading for standing
    Extending,
}

/// One completed repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepEvent {
    /// 1-based, strictly increasing within a session
    pub sequence: u32,
    /// Timestamp of the frame that completed the rep
    pub completed_at_ms: u64,
}

/// Transition emitted by a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition {
    DepthReached { at_ms: u64 },
    RepCompleted(RepEvent),
}

/// Threshold angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub down_deg: f64,
    pub up_deg: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            down_deg: DEFAULT_DOWN_THRESHOLD,
            up_deg: DEFAULT_UP_THRESHOLD,
        }
    }
}

/// Tunables for the machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MachineSettings {
    pub thresholds: Thresholds,
    pub debounce_ms: u64,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// Output of one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutput {
    pub state: SquatState,
    pub transition: Option<Transition>,
    /// Set only while `Transitioning`
    pub direction: Option<Direction>,
}

/// Complete machine state; serializable so a session can be snapshotted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquatMachine {
    pub state: SquatState,
    pub phase: Phase,
    pub last_down_ms: Option<u64>,
    pub last_rep_ms: Option<u64>,
    pub rep_count: u32,
}

impl Default for SquatMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SquatMachine {
    /// Standing, no reps, no debounce history.
    pub fn new() -> Self {
        Self {
            state: SquatState::Up,
            phase: Phase::Up,
            last_down_ms: None,
            last_rep_ms: None,
            rep_count: 0,
        }
    }

    /// Pure transition: returns the next state and what happened.
    pub fn step(&self, settings: &MachineSettings, angle: f64, now_ms: u64) -> (Self, StepOutput) {
        let mut next = self.clone();
        let output = next.apply(settings, angle, now_ms);
        (next, output)
    }

    /// Advance in place by one frame.
    pub fn apply(&mut self, settings: &MachineSettings, angle: f64, now_ms: u64) -> StepOutput {
        let Thresholds { down_deg, up_deg } = settings.thresholds;
        let elapsed = |since: Option<u64>| {
            since.map_or(true, |t| now_ms.saturating_sub(t) > settings.debounce_ms)
        };

        if angle <= down_deg && self.phase == Phase::Up && elapsed(self.last_down_ms) {
            self.phase = Phase::Down;
            self.state = SquatState::Down;
            self.last_down_ms = Some(now_ms);
            debug!(angle, now_ms, "depth reached");
            return StepOutput {
                state: self.state,
                transition: Some(Transition::DepthReached { at_ms: now_ms }),
                direction: None,
            };
        }

        if angle >= up_deg && self.phase == Phase::Down && elapsed(self.last_rep_ms) {
            self.phase = Phase::Up;
            self.state = SquatState::Up;
            self.last_rep_ms = Some(now_ms);
            self.rep_count += 1;
            let event = RepEvent {
                sequence: self.rep_count,
                completed_at_ms: now_ms,
            };
            debug!(angle, now_ms, sequence = event.sequence, "rep completed");
            return StepOutput {
                state: self.state,
                transition: Some(Transition::RepCompleted(event)),
                direction: None,
            };
        }

        if angle > down_deg && angle < up_deg {
            self.state = SquatState::Transitioning;
            let direction = match self.phase {
                Phase::Up => Direction::Bending,
                Phase::Down => Direction::Extending,
            };
            return StepOutput {
                state: self.state,
                transition: None,
                direction: Some(direction),
            };
        }

        self.state = self.phase.into();
        StepOutput {
            state: self.state,
            transition: None,
            direction: None,
        }
    }

    /// Clear all state for a new session.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(machine: &mut SquatMachine, samples: &[(f64, u64)]) -> Vec<Transition> {
        let settings = MachineSettings::default();
        samples
            .iter()
            .filter_map(|&(angle, t)| machine.apply(&settings, angle, t).transition)
            .collect()
    }

    fn reps(transitions: &[Transition]) -> Vec<RepEvent> {
        transitions
            .iter()
            .filter_map(|t| match t {
                Transition::RepCompleted(e) => Some(*e),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_single_rep() {
        let mut machine = SquatMachine::new();
        let out = run(&mut machine, &[(180.0, 0), (90.0, 1_000), (180.0, 2_000)]);

        assert_eq!(
            out,
            vec![
                Transition::DepthReached { at_ms: 1_000 },
                Transition::RepCompleted(RepEvent {
                    sequence: 1,
                    completed_at_ms: 2_000
                }),
            ]
        );
        assert_eq!(machine.rep_count, 1);
        assert_eq!(machine.state, SquatState::Up);
    }

    #[test]
    fn test_debounce_suppresses_second_down() {
        let mut machine = SquatMachine::new();
        let out = run(
            &mut machine,
            &[
                (180.0, 0),
                (90.0, 200),
                (180.0, 400),
                (90.0, 600),
                (180.0, 800),
            ],
        );

        let downs = out
            .iter()
            .filter(|t| matches!(t, Transition::DepthReached { .. }))
            .count();
        assert_eq!(downs, 1);
        assert_eq!(reps(&out).len(), 1);
    }

    #[test]
    fn test_debounce_must_be_exceeded() {
        let mut machine = SquatMachine::new();
        let out = run(
            &mut machine,
            &[(90.0, 1_000), (180.0, 1_500), (90.0, 2_000), (90.0, 2_001)],
        );

        // 2000 - 1000 equals the interval; only the next frame exceeds it.
        assert_eq!(
            out.last(),
            Some(&Transition::DepthReached { at_ms: 2_001 })
        );
    }

    #[test]
    fn test_peak_without_valley_never_counts() {
        let mut machine = SquatMachine::new();
        let out = run(&mut machine, &[(180.0, 0), (130.0, 2_000), (180.0, 4_000)]);
        assert!(out.is_empty());
        assert_eq!(machine.rep_count, 0);
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let mut machine = SquatMachine::new();
        let out = run(&mut machine, &[(110.0, 2_000), (150.0, 4_000)]);
        assert_eq!(reps(&out).len(), 1);
    }

    #[test]
    fn test_band_reports_direction() {
        let settings = MachineSettings::default();
        let mut machine = SquatMachine::new();

        let out = machine.apply(&settings, 130.0, 0);
        assert_eq!(out.state, SquatState::Transitioning);
        assert_eq!(out.direction, Some(Direction::Bending));

        machine.apply(&settings, 90.0, 2_000);
        let out = machine.apply(&settings, 130.0, 2_100);
        assert_eq!(out.direction, Some(Direction::Extending));
        assert_eq!(machine.phase, Phase::Down);
    }

    #[test]
    fn test_transitioning_does_not_block_counting() {
        let mut machine = SquatMachine::new();
        let out = run(
            &mut machine,
            &[
                (170.0, 0),
                (130.0, 300),
                (100.0, 600),
                (130.0, 900),
                (160.0, 1_200),
            ],
        );
        assert_eq!(reps(&out).len(), 1);
    }

    #[test]
    fn test_below_threshold_while_debounced_reports_committed_phase() {
        let settings = MachineSettings::default();
        let mut machine = SquatMachine::new();
        machine.apply(&settings, 90.0, 1_000);
        machine.apply(&settings, 170.0, 1_500);

        let out = machine.apply(&settings, 90.0, 1_600);
        assert_eq!(out.transition, None);
        assert_eq!(out.state, SquatState::Up);
    }

    #[test]
    fn test_sequences_are_gapless() {
        let mut machine = SquatMachine::new();
        let mut samples = Vec::new();
        for i in 0..8u64 {
            samples.push((90.0, i * 3_000 + 1_000));
            samples.push((175.0, i * 3_000 + 2_500));
        }
        let sequences: Vec<u32> = reps(&run(&mut machine, &samples))
            .iter()
            .map(|e| e.sequence)
            .collect();
        assert_eq!(sequences, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn test_step_is_pure() {
        let settings = MachineSettings::default();
        let machine = SquatMachine::new();
        let (next, out) = machine.step(&settings, 90.0, 5_000);

        assert_eq!(machine, SquatMachine::new());
        assert_eq!(next.phase, Phase::Down);
        assert!(out.transition.is_some());
    }

    #[test]
    fn test_state_serializes() {
        let mut machine = SquatMachine::new();
        machine.apply(&MachineSettings::default(), 90.0, 1_000);

        let json = serde_json::to_string(&machine).unwrap();
        let back: SquatMachine = serde_json::from_str(&json).unwrap();
        assert_eq!(back, machine);
    }

    #[test]
    fn test_nan_angle_is_ignored() {
        let settings = MachineSettings::default();
        let mut machine = SquatMachine::new();
        let out = machine.apply(&settings, f64::NAN, 5_000);
        assert_eq!(out.transition, None);
        assert_eq!(out.state, SquatState::Up);
    }
}
