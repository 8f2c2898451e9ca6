// src/comprehension.rs
//
// Comprehension check that gates every block.
//
// Three multiple-choice questions about the rules just explained:
//   1) which color is punished,
//   2) which shape requires the action,
//   3) what pressing the action key means in this block.
//
// Grading is a pure function of the answers; the retry loop lives in the
// session controller.

use std::io;

use serde::Serialize;

use crate::error::{ExperimentError, Result};
use crate::io::{Presenter, Tone, VisualElement};
use crate::messages::{render, Message};
use crate::stimulus::{ColorId, ShapeKind};
use crate::trials::BlockStimuli;
use crate::types::{BlockType, Flow};

/// Fixed answer options for the press-meaning question.
pub const PRESS_MEANING_OPTIONS: [&str; 4] = [
    "You get a reward",
    "You throw it away",
    "You take it",
    "You leave it",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum QuestionKind {
    PunishedColor,
    ActionShape,
    PressMeaning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub kind: QuestionKind,
    pub prompt: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct: usize,
}

/// Collaborator that picks an answer option for a displayed question.
pub trait Respondent {
    /// Index of the chosen option, or `Flow::Abort` on the abort key.
    fn choose(&mut self, question: &Question) -> io::Result<Flow<usize>>;
}

#[derive(Debug, Clone)]
pub struct ComprehensionCheck {
    questions: Vec<Question>,
}

impl ComprehensionCheck {
    /// Questions for one block. Option lists are the session catalogues, so
    /// the answer is never given away by which options appear.
    pub fn for_block(
        block_type: BlockType,
        stimuli: &BlockStimuli,
        shape_catalogue: &[ShapeKind],
        color_catalogue: &[ColorId],
    ) -> Result<Self> {
        let punished = color_catalogue
            .iter()
            .position(|&c| c == stimuli.punishment_color)
            .ok_or_else(|| {
                ExperimentError::config(format!(
                    "punishment color {} missing from catalogue",
                    stimuli.punishment_color
                ))
            })?;
        let action = shape_catalogue
            .iter()
            .position(|&s| s == stimuli.go_shape)
            .ok_or_else(|| {
                ExperimentError::config(format!(
                    "go shape {} missing from catalogue",
                    stimuli.go_shape
                ))
            })?;
        let meaning = match block_type {
            BlockType::Congruent => 2,
            BlockType::Incongruent => 1,
        };

        let question = |kind, options: Vec<String>, correct| Question {
            kind,
            prompt: render(&Message::Question(kind)),
            options,
            correct,
        };

        Ok(Self {
            questions: vec![
                question(
                    QuestionKind::PunishedColor,
                    color_catalogue.iter().map(|c| c.name().to_string()).collect(),
                    punished,
                ),
                question(
                    QuestionKind::ActionShape,
                    shape_catalogue.iter().map(|s| s.name().to_string()).collect(),
                    action,
                ),
                question(
                    QuestionKind::PressMeaning,
                    PRESS_MEANING_OPTIONS.iter().map(|s| s.to_string()).collect(),
                    meaning,
                ),
            ],
        })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// True iff every question has an answer and every answer is correct.
    pub fn grade(&self, answers: &[usize]) -> bool {
        answers.len() == self.questions.len()
            && self
                .questions
                .iter()
                .zip(answers)
                .all(|(q, &a)| a == q.correct)
    }

    /// Show every question, collect one answer each, then grade.
    ///
    /// All questions are asked even after a wrong answer; no feedback is
    /// given per question.
    pub fn ask<D: Presenter + Respondent + ?Sized>(&self, dev: &mut D) -> io::Result<Flow<bool>> {
        let mut answers = Vec::with_capacity(self.questions.len());
        for q in &self.questions {
            dev.draw(&VisualElement::Text {
                text: q.prompt.clone(),
                pos: (0.0, 0.5),
                height: 0.08,
                tone: Tone::Plain,
            });
            let n = q.options.len();
            for (i, label) in q.options.iter().enumerate() {
                // Spread buttons evenly across the lower half.
                let x = if n > 1 {
                    -0.75 + 1.5 * (i as f64) / ((n - 1) as f64)
                } else {
                    0.0
                };
                dev.draw(&VisualElement::Button {
                    index: i,
                    label: label.clone(),
                    pos: (x, -0.3),
                });
            }
            dev.present()?;
            answers.push(crate::proceed!(dev.choose(q)?));
        }
        Ok(Flow::Continue(self.grade(&answers)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExperimentConfig;

    fn check(block_type: BlockType) -> ComprehensionCheck {
        let cfg = ExperimentConfig::default();
        let stimuli = BlockStimuli {
            go_shape: ShapeKind::Triangle,
            nogo_shape: ShapeKind::Circle,
            reward_color: ColorId::Blue,
            punishment_color: ColorId::Yellow,
        };
        ComprehensionCheck::for_block(block_type, &stimuli, &cfg.shape_catalogue, &cfg.color_catalogue)
            .unwrap()
    }

    #[test]
    fn answer_key_follows_block_assignment() {
        let c = check(BlockType::Congruent);
        let key: Vec<usize> = c.questions().iter().map(|q| q.correct).collect();
        // Catalogue order: purple, blue, yellow, pink / star, triangle, circle, square.
        assert_eq!(key, vec![2, 1, 2]);
        assert_eq!(check(BlockType::Incongruent).questions()[2].correct, 1);
    }

    #[test]
    fn grade_is_idempotent() {
        let c = check(BlockType::Congruent);
        for answers in [vec![2, 1, 2], vec![2, 1, 1], vec![2, 1]] {
            assert_eq!(c.grade(&answers), c.grade(&answers));
        }
        assert!(c.grade(&[2, 1, 2]));
        assert!(!c.grade(&[2, 1, 1]));
        assert!(!c.grade(&[2, 1]));
    }

    #[test]
    fn missing_catalogue_entry_is_a_configuration_error() {
        let stimuli = BlockStimuli {
            go_shape: ShapeKind::Rhombus,
            nogo_shape: ShapeKind::Circle,
            reward_color: ColorId::Blue,
            punishment_color: ColorId::Yellow,
        };
        let cfg = ExperimentConfig::default();
        assert!(ComprehensionCheck::for_block(
            BlockType::Congruent,
            &stimuli,
            &cfg.shape_catalogue,
            &cfg.color_catalogue
        )
        .is_err());
    }
}
