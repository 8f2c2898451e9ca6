// src/messages.rs
//
// Participant-facing text.
//
// Every screen is a `Message` value; everything it interpolates travels
// inside the variant, so `render` is a pure function of its argument.

use crate::comprehension::QuestionKind;
use crate::state::SessionSummary;
use crate::trials::BlockStimuli;
use crate::types::BlockType;

const CONTINUE: &str = "Press space to continue.";

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Intro,
    General,
    /// Framing instructions for a block (1-based index).
    BlockInstructions {
        block_number: usize,
        block_type: BlockType,
        stimuli: BlockStimuli,
    },
    /// One-screen recap shown right before the comprehension check.
    Overview {
        block_type: BlockType,
        stimuli: BlockStimuli,
    },
    QuestionnaireIntro,
    Question(QuestionKind),
    QuestionWrong,
    StartTrials {
        block_number: usize,
    },
    Break {
        finished_block: usize,
        score: i64,
    },
    End(SessionSummary),
    EarlyQuit,
    /// What the participant did on a trial, framed by the block.
    ActionResult {
        block_type: BlockType,
        pressed: bool,
        accuracy: bool,
    },
}

/// Verb the action key stands for in a block.
pub fn press_verb(block_type: BlockType) -> &'static str {
    match block_type {
        BlockType::Congruent => "take",
        BlockType::Incongruent => "throw away",
    }
}

/// Description of the participant's behavior on a trial.
pub fn action_text(block_type: BlockType, pressed: bool) -> &'static str {
    match (block_type, pressed) {
        (BlockType::Congruent, true) => "You took it",
        (BlockType::Congruent, false) => "You left it alone",
        (BlockType::Incongruent, true) => "You threw it away",
        (BlockType::Incongruent, false) => "You left it lying",
    }
}

pub fn render(message: &Message) -> String {
    match message {
        Message::Intro => format!(
            "Welcome, and thank you for taking part.\n\n\
             In this experiment you will see colored shapes one at a time.\n\
             For each shape you decide whether to press the space bar or not.\n\n\
             {CONTINUE}"
        ),
        Message::General => format!(
            "Every shape is worth points.\n\n\
             The color of a shape tells you whether it can win you points or \
             lose you points. The shape itself tells you whether to press space.\n\n\
             Feedback is not always reliable: even when you do the right thing, \
             the outcome is sometimes disappointing. Try to earn as many points \
             as you can.\n\n\
             Press escape at any time to stop the experiment.\n\n\
             {CONTINUE}"
        ),
        Message::BlockInstructions {
            block_number,
            block_type,
            stimuli,
        } => {
            let framing = match block_type {
                BlockType::Congruent => {
                    "In this part, pressing space means you TAKE the object.\n\
                     Taking a good object wins points; taking a bad one costs points."
                }
                BlockType::Incongruent => {
                    "In this part, pressing space means you THROW the object AWAY.\n\
                     Throwing away a bad object avoids a loss; throwing away a good one \
                     forfeits a win."
                }
            };
            format!(
                "Part {block_number}\n\n\
                 {framing}\n\n\
                 Press space for {go}. Do nothing for {nogo}.\n\
                 {reward} objects earn points, {punish} objects lose points.\n\n\
                 {CONTINUE}",
                go = stimuli.go_shape,
                nogo = stimuli.nogo_shape,
                reward = capitalize(stimuli.reward_color.name()),
                punish = capitalize(stimuli.punishment_color.name()),
            )
        }
        Message::Overview {
            block_type,
            stimuli,
        } => format!(
            "Overview\n\n\
             space = {verb}\n\
             {go}: press space\n\
             {nogo}: do nothing\n\
             {reward}: reward\n\
             {punish}: punishment\n\n\
             {CONTINUE}",
            verb = press_verb(*block_type),
            go = stimuli.go_shape,
            nogo = stimuli.nogo_shape,
            reward = stimuli.reward_color,
            punish = stimuli.punishment_color,
        ),
        Message::QuestionnaireIntro => format!(
            "Before you start, a few short questions check that the rules are clear.\n\
             Pick an answer with the number keys.\n\n\
             {CONTINUE}"
        ),
        Message::Question(kind) => match kind {
            QuestionKind::PunishedColor => "Which color loses you points?".to_string(),
            QuestionKind::ActionShape => "For which shape do you press space?".to_string(),
            QuestionKind::PressMeaning => "What happens when you press space?".to_string(),
        },
        Message::QuestionWrong => format!(
            "Not all answers were correct.\n\n\
             The instructions will be shown again. Read them carefully.\n\n\
             {CONTINUE}"
        ),
        Message::StartTrials { block_number } => format!(
            "All answers were correct.\n\n\
             Part {block_number} starts now. Keep your finger on the space bar.\n\n\
             {CONTINUE}"
        ),
        Message::Break {
            finished_block,
            score,
        } => format!(
            "End of part {finished_block}. Your score so far: {score} points.\n\n\
             Take a short break. The next part uses new shapes, new colors and new rules.\n\n\
             {CONTINUE}"
        ),
        Message::End(summary) => format!(
            "The experiment is over. Thank you!\n\n\
             Final score: {} points\n\
             Correct: {} of {} trials ({:.1}%)\n\n\
             {CONTINUE}",
            summary.total_score, summary.n_correct, summary.n_trials, summary.percent_correct
        ),
        Message::EarlyQuit => format!(
            "The experiment was stopped early.\n\n\
             Everything up to this point has been saved.\n\n\
             {CONTINUE}"
        ),
        Message::ActionResult {
            block_type,
            pressed,
            accuracy,
        } => {
            let verdict = if *accuracy { "Correct!" } else { "Wrong!" };
            format!("{verdict}\n{}", action_text(*block_type, *pressed))
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
