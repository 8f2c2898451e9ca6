// src/executor.rs
//
// Trial executor: drives one trial through its timed phases.
//
//   IDLE → INTERTRIAL_WAIT → FIXATION → STIMULUS_VISIBLE → RESPONSE_WINDOW
//        → FEEDBACK → LOGGED
//
// Phases run strictly in order, never back. Every wait is a key wait that
// honours the abort key; an abort anywhere returns `Flow::Abort` before the
// row is written.

use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::config::ExperimentConfig;
use crate::devstats::explain_trial;
use crate::error::Result;
use crate::io::{hold, InputDevice, Presenter, Tone, VisualElement};
use crate::logging::{ResultRow, ResultSink};
use crate::messages::{render, Message};
use crate::outcome::{Outcome, OutcomeEngine};
use crate::participant::ParticipantInfo;
use crate::proceed;
use crate::state::SessionState;
use crate::trials::TrialSpec;
use crate::types::{BlockType, Flow, Key, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrialPhase {
    Idle,
    IntertrialWait,
    Fixation,
    StimulusVisible,
    ResponseWindow,
    Feedback,
    Logged,
}

impl TrialPhase {
    pub const SEQUENCE: [TrialPhase; 7] = [
        TrialPhase::Idle,
        TrialPhase::IntertrialWait,
        TrialPhase::Fixation,
        TrialPhase::StimulusVisible,
        TrialPhase::ResponseWindow,
        TrialPhase::Feedback,
        TrialPhase::Logged,
    ];

    /// Successor within one trial; None after LOGGED.
    pub fn next(self) -> Option<TrialPhase> {
        let i = Self::SEQUENCE.iter().position(|&p| p == self)?;
        Self::SEQUENCE.get(i + 1).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrialPhase::Idle => "idle",
            TrialPhase::IntertrialWait => "intertrial_wait",
            TrialPhase::Fixation => "fixation",
            TrialPhase::StimulusVisible => "stimulus_visible",
            TrialPhase::ResponseWindow => "response_window",
            TrialPhase::Feedback => "feedback",
            TrialPhase::Logged => "logged",
        }
    }
}

/// Tracks the walk through the phases of one trial.
#[derive(Debug)]
struct PhaseWalk {
    trial_index: usize,
    current: TrialPhase,
    visited: Vec<TrialPhase>,
}

impl PhaseWalk {
    fn new(trial_index: usize) -> Self {
        Self {
            trial_index,
            current: TrialPhase::Idle,
            visited: vec![TrialPhase::Idle],
        }
    }

    fn advance(&mut self, to: TrialPhase) {
        debug_assert_eq!(self.current.next(), Some(to), "phase skipped or reversed");
        debug!(
            trial = self.trial_index,
            from = self.current.as_str(),
            to = to.as_str(),
            "trial phase"
        );
        self.current = to;
        self.visited.push(to);
    }
}

/// Timing of the phases shared by every trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialTiming {
    pub intertrial_interval: Duration,
    pub response_deadline: Duration,
    /// Zero = no separate "what you did" phase.
    pub result_duration: Duration,
    pub feedback_duration: Duration,
    pub stim_size: f64,
}

impl TrialTiming {
    pub fn from_config(cfg: &ExperimentConfig) -> Self {
        Self {
            intertrial_interval: cfg.intertrial_interval(),
            response_deadline: cfg.response_deadline(),
            result_duration: cfg.result_duration(),
            feedback_duration: cfg.feedback_duration(),
            stim_size: cfg.stim_size,
        }
    }
}

/// Per-block values stamped on every row.
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    pub participant: &'a ParticipantInfo,
    /// 1-based.
    pub block_index: usize,
    pub times_instructions_read: u32,
}

#[derive(Debug, Clone)]
pub struct TrialResult {
    pub outcome: Outcome,
    pub response_time: Option<Duration>,
    pub row: ResultRow,
    /// Phases in the order they were entered.
    pub phases: Vec<TrialPhase>,
}

#[derive(Debug, Clone)]
pub struct TrialExecutor {
    timing: TrialTiming,
    engine: OutcomeEngine,
    devstats: bool,
}

impl TrialExecutor {
    pub fn new(timing: TrialTiming, engine: OutcomeEngine, devstats: bool) -> Self {
        Self {
            timing,
            engine,
            devstats,
        }
    }

    pub fn from_config(cfg: &ExperimentConfig) -> Result<Self> {
        Ok(Self::new(
            TrialTiming::from_config(cfg),
            OutcomeEngine::new(cfg.feedback_validity)?,
            cfg.devstats,
        ))
    }

    pub fn timing(&self) -> &TrialTiming {
        &self.timing
    }

    pub fn engine(&self) -> &OutcomeEngine {
        &self.engine
    }

    fn stimulus(&self, trial: &TrialSpec, acknowledged: bool) -> VisualElement {
        VisualElement::Stimulus {
            shape: trial.shape,
            color: trial.color,
            geometry: trial.shape.geometry(self.timing.stim_size),
            acknowledged,
        }
    }

    /// Run one trial end to end. `trial_index` is 1-based.
    #[allow(clippy::too_many_arguments)]
    pub fn run_trial<D, R>(
        &self,
        dev: &mut D,
        trial: &TrialSpec,
        trial_index: usize,
        ctx: &RowContext<'_>,
        state: &mut SessionState,
        rng: &mut R,
        sink: &mut dyn ResultSink,
    ) -> Result<Flow<TrialResult>>
    where
        D: Presenter + InputDevice + ?Sized,
        R: Rng + ?Sized,
    {
        let mut walk = PhaseWalk::new(trial_index);
        let deadline = self.timing.response_deadline;

        walk.advance(TrialPhase::IntertrialWait);
        dev.present()?;
        proceed!(hold(dev, self.timing.intertrial_interval)?);

        walk.advance(TrialPhase::Fixation);
        dev.draw(&VisualElement::FixationCross);
        dev.present()?;
        proceed!(hold(dev, trial.fixation)?);

        walk.advance(TrialPhase::StimulusVisible);
        dev.draw(&self.stimulus(trial, false));
        dev.present()?;
        let onset = dev.now();

        walk.advance(TrialPhase::ResponseWindow);
        let response_time = match dev.wait_for_key(&[Key::Action, Key::Abort], Some(deadline))? {
            Some(Key::Abort) => return Ok(Flow::Abort),
            Some(Key::Action) => {
                let rt = dev.elapsed_since(onset);
                // Stimulus stays up with the overlay until the deadline.
                dev.draw(&self.stimulus(trial, true));
                dev.present()?;
                proceed!(hold(dev, deadline.saturating_sub(rt))?);
                (rt < deadline).then_some(rt)
            }
            None => None,
        };

        walk.advance(TrialPhase::Feedback);
        let outcome = self.engine.evaluate(trial, response_time, state, rng);
        if self.devstats {
            debug!(trial = trial_index, "\n{}", explain_trial(trial, &outcome, &self.engine));
        }
        proceed!(self.show_feedback(dev, trial.block_type, &outcome)?);

        walk.advance(TrialPhase::Logged);
        let row = ResultRow {
            participant_nr: ctx.participant.number,
            participant_gender: ctx.participant.gender,
            participant_age: ctx.participant.age,
            colorblind: ctx.participant.color_blind,
            block_index: ctx.block_index,
            block_type: trial.block_type,
            trial_index,
            shape: trial.shape,
            color: trial.color,
            incentive: trial.incentive,
            correct_response: trial.correct_response,
            given_response: outcome.given_response,
            accuracy: outcome.accuracy,
            feedback: outcome.feedback,
            correct_feedback: outcome.correct_feedback,
            response_time: response_time.map(|d| d.as_secs_f64()),
            fixation_duration: trial.fixation.as_secs_f64(),
            sequence_tag: trial.sequence_tag,
            times_instructions_read: ctx.times_instructions_read,
            total_score: state.total_score,
        };
        sink.append_row(&row)?;
        state.rows_written += 1;

        Ok(Flow::Continue(TrialResult {
            outcome,
            response_time,
            row,
            phases: walk.visited,
        }))
    }

    fn show_feedback<D: Presenter + InputDevice + ?Sized>(
        &self,
        dev: &mut D,
        block_type: BlockType,
        outcome: &Outcome,
    ) -> Result<Flow<()>> {
        let action = VisualElement::Text {
            text: render(&Message::ActionResult {
                block_type,
                pressed: outcome.given_response == Response::Go,
                accuracy: outcome.accuracy,
            }),
            pos: (0.0, -0.25),
            height: 0.08,
            tone: Tone::Plain,
        };

        if !self.timing.result_duration.is_zero() {
            dev.draw(&action);
            dev.present()?;
            proceed!(hold(dev, self.timing.result_duration)?);
        }

        let tone = if outcome.feedback.points() > 0 {
            Tone::Positive
        } else {
            Tone::Negative
        };
        dev.draw(&VisualElement::Text {
            text: outcome.feedback.label().to_string(),
            pos: (0.0, 0.2),
            height: 0.2,
            tone,
        });
        dev.draw(&action);
        dev.present()?;
        proceed!(hold(dev, self.timing.feedback_duration)?);
        Ok(Flow::Continue(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_advance_strictly_in_order() {
        let mut p = TrialPhase::Idle;
        let mut seen = vec![p];
        while let Some(n) = p.next() {
            seen.push(n);
            p = n;
        }
        assert_eq!(seen, TrialPhase::SEQUENCE.to_vec());
        assert_eq!(TrialPhase::Logged.next(), None);
    }

    #[test]
    fn timing_follows_config() {
        let cfg = ExperimentConfig {
            result_duration_s: 0.25,
            ..ExperimentConfig::default()
        };
        let t = TrialTiming::from_config(&cfg);
        assert_eq!(t.response_deadline, Duration::from_secs(1));
        assert_eq!(t.result_duration, Duration::from_millis(250));
        assert_eq!(t.intertrial_interval, Duration::from_millis(500));
    }
}
