// src/state.rs
//
// Session-wide running totals. Owned by the session controller and passed
// explicitly into the executor / outcome engine; never global.

use std::time::Duration;

use serde::Serialize;

use crate::metrics::OnlineStats;
use crate::outcome::Outcome;
use crate::types::Incentive;

/// Favorable-feedback counts per (accuracy × incentive) cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedbackTally {
    /// `[accurate][incentive]` → (favorable, total). Index 0 = inaccurate /
    /// reward, 1 = accurate / punishment.
    cells: [[(u64, u64); 2]; 2],
}

impl FeedbackTally {
    fn slot(accuracy: bool, incentive: Incentive) -> (usize, usize) {
        let a = usize::from(accuracy);
        let i = match incentive {
            Incentive::Reward => 0,
            Incentive::Punishment => 1,
        };
        (a, i)
    }

    pub fn add(&mut self, accuracy: bool, incentive: Incentive, favorable: bool) {
        let (a, i) = Self::slot(accuracy, incentive);
        let cell = &mut self.cells[a][i];
        cell.0 += u64::from(favorable);
        cell.1 += 1;
    }

    /// (favorable, total) for one cell.
    pub fn get(&self, accuracy: bool, incentive: Incentive) -> (u64, u64) {
        let (a, i) = Self::slot(accuracy, incentive);
        self.cells[a][i]
    }

    /// Empirical favorable rate, None when the cell is empty.
    pub fn favorable_rate(&self, accuracy: bool, incentive: Incentive) -> Option<f64> {
        let (fav, n) = self.get(accuracy, incentive);
        (n > 0).then(|| fav as f64 / n as f64)
    }

    pub fn merge(&mut self, other: &FeedbackTally) {
        for a in 0..2 {
            for i in 0..2 {
                self.cells[a][i].0 += other.cells[a][i].0;
                self.cells[a][i].1 += other.cells[a][i].1;
            }
        }
    }
}

/// Running totals for the whole session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Cumulative points (+10 / +1 / -1 / -10 per trial).
    pub total_score: i64,
    /// Trials with accuracy = true.
    pub n_correct: u64,
    /// Trials evaluated so far.
    pub n_trials: u64,
    /// Result rows handed to the sink.
    pub rows_written: u64,
    /// Times the instructions were read for the current block (starts at 1).
    pub times_instructions_read: u32,
    /// Failed comprehension checks over the whole session.
    pub comprehension_retries: u32,
    /// Response times of trials answered within the deadline (seconds).
    pub response_times: OnlineStats,
    pub feedback_tally: FeedbackTally,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one evaluated trial into the totals.
    pub fn record(&mut self, outcome: &Outcome, response_time: Option<Duration>) {
        self.total_score += outcome.feedback.points();
        self.n_trials += 1;
        if outcome.accuracy {
            self.n_correct += 1;
        }
        if let Some(rt) = response_time {
            self.response_times.add(rt.as_secs_f64());
        }
    }

    pub fn tally(&mut self, accuracy: bool, incentive: Incentive, favorable: bool) {
        self.feedback_tally.add(accuracy, incentive, favorable);
    }

    pub fn percent_correct(&self) -> f64 {
        if self.n_trials == 0 {
            0.0
        } else {
            100.0 * self.n_correct as f64 / self.n_trials as f64
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            total_score: self.total_score,
            n_correct: self.n_correct,
            n_trials: self.n_trials,
            percent_correct: self.percent_correct(),
            comprehension_retries: self.comprehension_retries,
            mean_response_time_s: (self.response_times.n() > 0)
                .then(|| self.response_times.mean()),
            sd_response_time_s: (self.response_times.n() > 1)
                .then(|| self.response_times.stddev_sample()),
        }
    }
}

/// End-of-session summary, shown to the participant and logged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub total_score: i64,
    pub n_correct: u64,
    pub n_trials: u64,
    pub percent_correct: f64,
    pub comprehension_retries: u32,
    pub mean_response_time_s: Option<f64>,
    pub sd_response_time_s: Option<f64>,
}
