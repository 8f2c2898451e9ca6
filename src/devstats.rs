// src/devstats.rs
//
// Developer diagnostics: block crosstab, ordered trial listing and a
// plain-language explanation of each trial's outcome. Only logged when
// devstats is on; never part of the data file.

use std::fmt::Write as _;

use crate::outcome::{Outcome, OutcomeEngine};
use crate::trials::{cell_counts, TrialSpec};
use crate::types::Feedback;

/// Incentive × correct_response count table.
pub fn crosstab(trials: &[TrialSpec]) -> String {
    // cell_counts order: (Go,reward) (NoGo,punishment) (NoGo,reward) (Go,punishment)
    let [go_rew, nogo_pun, nogo_rew, go_pun] = cell_counts(trials);
    let mut out = String::new();
    let _ = writeln!(out, "{:<12}{:>6}{:>6}{:>7}", "", "Go", "NoGo", "total");
    let _ = writeln!(
        out,
        "{:<12}{:>6}{:>6}{:>7}",
        "reward",
        go_rew,
        nogo_rew,
        go_rew + nogo_rew
    );
    let _ = writeln!(
        out,
        "{:<12}{:>6}{:>6}{:>7}",
        "punishment",
        go_pun,
        nogo_pun,
        go_pun + nogo_pun
    );
    let _ = write!(
        out,
        "{:<12}{:>6}{:>6}{:>7}",
        "total",
        go_rew + go_pun,
        nogo_rew + nogo_pun,
        trials.len()
    );
    out
}

/// Trials in execution order, with a separator after every 8.
pub fn trial_listing(trials: &[TrialSpec]) -> String {
    let mut out = String::new();
    for (i, t) in trials.iter().enumerate() {
        if i > 0 && i % 8 == 0 {
            out.push_str("--------\n");
        }
        let _ = writeln!(
            out,
            "{:>4}  {:<5} {:<10} {:<8} {:<22} fix={:.3}s tag={}",
            i + 1,
            t.correct_response.as_str(),
            t.incentive.as_str(),
            t.color.name(),
            t.shape.name(),
            t.fixation.as_secs_f64(),
            t.sequence_tag.map(|x| x.to_string()).unwrap_or_else(|| "-".into()),
        );
    }
    out
}

/// Explanation of a single evaluated trial.
pub fn explain_trial(trial: &TrialSpec, outcome: &Outcome, engine: &OutcomeEngine) -> String {
    let options = Feedback::options(trial.incentive);
    let dist = engine.distribution(outcome.accuracy);
    let interpretation = match (outcome.accuracy, outcome.feedback == outcome.correct_feedback) {
        (true, true) => "correct response, feedback confirms it",
        (true, false) => "correct response, misleading feedback",
        (false, true) => "wrong response, feedback confirms it",
        (false, false) => "wrong response, misleading feedback",
    };
    format!(
        "stimulus: {} {} ({}, {})\n\
         response: given {} / correct {} -> accuracy {}\n\
         feedback: drew {} from [{} p={:.2}, {} p={:.2}] (reference {})\n\
         {}",
        trial.color,
        trial.shape,
        trial.incentive.as_str(),
        trial.block_type.as_str(),
        outcome.given_response.as_str(),
        trial.correct_response.as_str(),
        outcome.accuracy,
        outcome.feedback,
        options[0],
        dist[0],
        options[1],
        dist[1],
        outcome.correct_feedback,
        interpretation,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stimulus::{ColorId, ShapeKind};
    use crate::types::{BlockType, Incentive, Response};
    use std::time::Duration;

    fn trials(n: usize) -> Vec<TrialSpec> {
        let cells = [
            (Response::Go, Incentive::Reward),
            (Response::NoGo, Incentive::Punishment),
            (Response::NoGo, Incentive::Reward),
            (Response::Go, Incentive::Punishment),
        ];
        (0..n)
            .map(|i| TrialSpec {
                block_type: BlockType::Congruent,
                shape: ShapeKind::Circle,
                correct_response: cells[i % 4].0,
                color: ColorId::Blue,
                incentive: cells[i % 4].1,
                fixation: Duration::from_millis(900),
                sequence_tag: Some((i % 8) as u32 + 1),
            })
            .collect()
    }

    #[test]
    fn crosstab_totals_match() {
        let table = crosstab(&trials(16));
        let last = table.lines().last().unwrap();
        assert!(last.starts_with("total"));
        assert!(last.trim_end().ends_with("16"));
        assert!(table.lines().nth(1).unwrap().contains("4"));
    }

    #[test]
    fn listing_separates_groups_of_eight() {
        let listing = trial_listing(&trials(16));
        assert_eq!(listing.matches("--------").count(), 1);
        assert_eq!(listing.lines().count(), 17);
    }

    #[test]
    fn explanation_mentions_distribution() {
        let engine = OutcomeEngine::new(0.8).unwrap();
        let t = &trials(1)[0];
        let outcome = Outcome {
            given_response: Response::Go,
            accuracy: true,
            feedback: Feedback::PlusOne,
            correct_feedback: Feedback::PlusTen,
        };
        let text = explain_trial(t, &outcome, &engine);
        assert!(text.contains("+10 p=0.80"));
        assert!(text.contains("misleading"));
    }
}
