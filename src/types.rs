// src/types.rs
//
// Common shared types for the Go/NoGo framing experiment.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Framing condition of a block.
/// - Congruent   = pressing means "take it" (action aligned with reward bias)
/// - Incongruent = pressing means "throw it away"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Congruent,
    Incongruent,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Congruent => "congruent",
            BlockType::Incongruent => "incongruent",
        }
    }
}

/// Go = act (press the action key), NoGo = withhold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Response {
    Go,
    NoGo,
}

impl Response {
    pub fn as_str(&self) -> &'static str {
        match self {
            Response::Go => "Go",
            Response::NoGo => "NoGo",
        }
    }

    pub fn from_pressed(pressed: bool) -> Self {
        if pressed {
            Response::Go
        } else {
            Response::NoGo
        }
    }
}

/// Incentive framing of a trial, carried by the stimulus color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Incentive {
    Reward,
    Punishment,
}

impl Incentive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Incentive::Reward => "reward",
            Incentive::Punishment => "punishment",
        }
    }
}

/// Feedback value shown after a trial.
///
/// Reward trials draw from {PlusTen, PlusOne}, punishment trials from
/// {MinusOne, MinusTen}. The first of each pair is the favorable outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feedback {
    #[serde(rename = "+10")]
    PlusTen,
    #[serde(rename = "+1")]
    PlusOne,
    #[serde(rename = "-1")]
    MinusOne,
    #[serde(rename = "-10")]
    MinusTen,
}

impl Feedback {
    /// Points added to the running score.
    pub fn points(&self) -> i64 {
        match self {
            Feedback::PlusTen => 10,
            Feedback::PlusOne => 1,
            Feedback::MinusOne => -1,
            Feedback::MinusTen => -10,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Feedback::PlusTen => "+10",
            Feedback::PlusOne => "+1",
            Feedback::MinusOne => "-1",
            Feedback::MinusTen => "-10",
        }
    }

    /// Arrow notation: best = "↑", neutral = "-", worst = "↓".
    pub fn arrow(&self) -> &'static str {
        match self {
            Feedback::PlusTen => "↑",
            Feedback::PlusOne | Feedback::MinusOne => "-",
            Feedback::MinusTen => "↓",
        }
    }

    /// (favorable, unfavorable) outcome pair for an incentive.
    pub fn options(incentive: Incentive) -> [Feedback; 2] {
        match incentive {
            Incentive::Reward => [Feedback::PlusTen, Feedback::PlusOne],
            Incentive::Punishment => [Feedback::MinusOne, Feedback::MinusTen],
        }
    }

    pub fn is_favorable(&self) -> bool {
        matches!(self, Feedback::PlusTen | Feedback::MinusOne)
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The two-key alphabet of every waiting phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Space bar: Go response / "continue" on instruction screens.
    Action,
    /// Escape: global cancellation.
    Abort,
}

/// Result of anything that can be interrupted by the abort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow<T> {
    Continue(T),
    Abort,
}

impl<T> Flow<T> {
    pub fn is_abort(&self) -> bool {
        matches!(self, Flow::Abort)
    }
}

/// Unwrap a `Flow`, returning `Ok(Flow::Abort)` from the enclosing
/// function on cancellation.
#[macro_export]
macro_rules! proceed {
    ($e:expr) => {
        match $e {
            $crate::types::Flow::Continue(v) => v,
            $crate::types::Flow::Abort => return Ok($crate::types::Flow::Abort),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_options_put_favorable_first() {
        let [fav, unfav] = Feedback::options(Incentive::Reward);
        assert!(fav.is_favorable());
        assert!(!unfav.is_favorable());
        assert_eq!(fav.points(), 10);
        assert_eq!(unfav.points(), 1);

        let [fav, unfav] = Feedback::options(Incentive::Punishment);
        assert_eq!(fav.points(), -1);
        assert_eq!(unfav.points(), -10);
        assert_eq!(unfav.arrow(), "↓");
    }

    #[test]
    fn feedback_serializes_as_label() {
        let s = serde_json::to_string(&Feedback::MinusTen).unwrap();
        assert_eq!(s, "\"-10\"");
    }
}
