// src/outcome.rs
//
// Outcome / feedback engine.
//
// Accuracy is deterministic; the feedback is a weighted draw over the
// incentive's two outcomes (partial reinforcement):
//
//   reward:     {+10, +1}    punishment: {-1, -10}
//   accurate:   favorable w.p. validity, unfavorable w.p. 1 - validity
//   inaccurate: favorable w.p. 1 - validity, unfavorable w.p. validity
//
// The RNG is always injected so the schedule is reproducible under a seed.

use std::time::Duration;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::Serialize;

use crate::error::{ExperimentError, Result};
use crate::state::SessionState;
use crate::trials::TrialSpec;
use crate::types::{Feedback, Response};

/// Result of evaluating one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub given_response: Response,
    pub accuracy: bool,
    /// The drawn feedback actually shown.
    pub feedback: Feedback,
    /// What the feedback would be without reinforcement noise.
    pub correct_feedback: Feedback,
}

#[derive(Debug, Clone)]
pub struct OutcomeEngine {
    validity: f64,
    /// Weights over [favorable, unfavorable] after an accurate response.
    accurate: WeightedIndex<f64>,
    /// Weights over [favorable, unfavorable] after an inaccurate response.
    inaccurate: WeightedIndex<f64>,
}

impl OutcomeEngine {
    pub fn new(validity: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&validity) {
            return Err(ExperimentError::config(format!(
                "feedback validity {validity} outside [0, 1]"
            )));
        }
        let weights = |p: f64| {
            WeightedIndex::new([p, 1.0 - p])
                .map_err(|e| ExperimentError::config(format!("feedback weights: {e}")))
        };
        Ok(Self {
            validity,
            accurate: weights(validity)?,
            inaccurate: weights(1.0 - validity)?,
        })
    }

    pub fn validity(&self) -> f64 {
        self.validity
    }

    /// Go trials are correct when a response was observed, NoGo trials when
    /// none was.
    pub fn accuracy(trial: &TrialSpec, responded: bool) -> bool {
        match trial.correct_response {
            Response::Go => responded,
            Response::NoGo => !responded,
        }
    }

    /// Distribution over [favorable, unfavorable] for a given accuracy.
    pub fn distribution(&self, accuracy: bool) -> [f64; 2] {
        if accuracy {
            [self.validity, 1.0 - self.validity]
        } else {
            [1.0 - self.validity, self.validity]
        }
    }

    /// Evaluate a trial without touching session state.
    pub fn draw<R: Rng + ?Sized>(&self, trial: &TrialSpec, responded: bool, rng: &mut R) -> Outcome {
        let accuracy = Self::accuracy(trial, responded);
        let options = Feedback::options(trial.incentive);

        let idx = if accuracy {
            self.accurate.sample(rng)
        } else {
            self.inaccurate.sample(rng)
        };

        Outcome {
            given_response: Response::from_pressed(responded),
            accuracy,
            feedback: options[idx],
            correct_feedback: if accuracy { options[0] } else { options[1] },
        }
    }

    /// Evaluate a trial and fold the result into the running totals.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        trial: &TrialSpec,
        response_time: Option<Duration>,
        state: &mut SessionState,
        rng: &mut R,
    ) -> Outcome {
        let outcome = self.draw(trial, response_time.is_some(), rng);
        state.record(&outcome, response_time);
        state.tally(outcome.accuracy, trial.incentive, outcome.feedback.is_favorable());
        outcome
    }
}
