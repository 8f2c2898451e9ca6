// src/session.rs
//
// Session controller: one participant, two framing blocks.
//
//   intro → for each block in parity order:
//       build trials → instructions / comprehension retry loop
//       → start screen → trials → break
//   → end screen with summary
//
// An abort at any wait unwinds straight here; the early-quit notice
// replaces the summary and rows already written stay in the sink.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::comprehension::ComprehensionCheck;
use crate::config::{ExperimentConfig, BLOCKS_PER_SESSION};
use crate::devstats::{crosstab, trial_listing};
use crate::error::Result;
use crate::executor::{RowContext, TrialExecutor};
use crate::io::{screen, Devices};
use crate::logging::{BlockMarker, ResultSink};
use crate::messages::{render, Message};
use crate::participant::ParticipantInfo;
use crate::proceed;
use crate::state::{SessionState, SessionSummary};
use crate::stimulus::StimulusPools;
use crate::trials::{Block, TrialSetBuilder};
use crate::types::Flow;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Completed(SessionSummary),
    Aborted { rows_written: u64 },
}

impl SessionOutcome {
    pub fn is_aborted(&self) -> bool {
        matches!(self, SessionOutcome::Aborted { .. })
    }
}

pub struct Session {
    cfg: ExperimentConfig,
    participant: ParticipantInfo,
    builder: TrialSetBuilder,
    executor: TrialExecutor,
    pools: StimulusPools,
    rng: ChaCha8Rng,
    state: SessionState,
}

impl Session {
    /// Validates the configuration before any stimulus is allocated.
    pub fn new(cfg: ExperimentConfig, participant: ParticipantInfo) -> Result<Self> {
        let builder = TrialSetBuilder::new(&cfg)?;
        let executor = TrialExecutor::from_config(&cfg)?;

        // Unseeded sessions still log a seed so they can be replayed.
        let seed = cfg.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let pools = StimulusPools::new(&cfg.shape_catalogue, &cfg.color_catalogue, &mut rng);

        info!(
            participant = participant.number,
            trials_per_block = cfg.trials_per_block,
            shuffle = cfg.shuffle.as_str(),
            seed,
            devstats = cfg.devstats,
            "session configured"
        );

        Ok(Self {
            cfg,
            participant,
            builder,
            executor,
            pools,
            rng,
            state: SessionState::new(),
        })
    }

    pub fn participant(&self) -> &ParticipantInfo {
        &self.participant
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn run<D: Devices + ?Sized>(
        &mut self,
        dev: &mut D,
        sink: &mut dyn ResultSink,
    ) -> Result<SessionOutcome> {
        match self.run_blocks(dev, sink)? {
            Flow::Continue(summary) => {
                info!(
                    score = summary.total_score,
                    correct = summary.n_correct,
                    trials = summary.n_trials,
                    "session completed"
                );
                Ok(SessionOutcome::Completed(summary))
            }
            Flow::Abort => {
                let rows_written = self.state.rows_written;
                warn!(rows_written, "session aborted by participant");
                // Any key leaves the notice, including a second escape.
                screen(dev, &render(&Message::EarlyQuit))?;
                Ok(SessionOutcome::Aborted { rows_written })
            }
        }
    }

    fn run_blocks<D: Devices + ?Sized>(
        &mut self,
        dev: &mut D,
        sink: &mut dyn ResultSink,
    ) -> Result<Flow<SessionSummary>> {
        proceed!(screen(dev, &render(&Message::Intro))?);
        proceed!(screen(dev, &render(&Message::General))?);

        for (i, block_type) in self.participant.block_order().into_iter().enumerate() {
            let block_number = i + 1;
            let block = self
                .builder
                .build(block_number, block_type, &mut self.pools, &mut self.rng)?;
            info!(
                block = block_number,
                block_type = block_type.as_str(),
                go = %block.stimuli.go_shape,
                nogo = %block.stimuli.nogo_shape,
                reward = %block.stimuli.reward_color,
                punishment = %block.stimuli.punishment_color,
                "block built"
            );
            if self.cfg.devstats {
                debug!("block {block_number} crosstab\n{}", crosstab(&block.trials));
                debug!("block {block_number} trials\n{}", trial_listing(&block.trials));
            }

            proceed!(self.instruct(dev, sink, &block)?);
            proceed!(screen(dev, &render(&Message::StartTrials { block_number }))?);
            proceed!(self.run_block(dev, sink, &block)?);

            if block_number < BLOCKS_PER_SESSION {
                proceed!(screen(
                    dev,
                    &render(&Message::Break {
                        finished_block: block_number,
                        score: self.state.total_score,
                    })
                )?);
            }
        }

        let summary = self.state.summary();
        // All data is written by now; leaving the end screen is not an abort.
        screen(dev, &render(&Message::End(summary.clone())))?;
        Ok(Flow::Continue(summary))
    }

    /// Instructions + comprehension check until every answer is right.
    fn instruct<D: Devices + ?Sized>(
        &mut self,
        dev: &mut D,
        sink: &mut dyn ResultSink,
        block: &Block,
    ) -> Result<Flow<()>> {
        let check = ComprehensionCheck::for_block(
            block.block_type,
            &block.stimuli,
            &self.cfg.shape_catalogue,
            &self.cfg.color_catalogue,
        )?;

        self.state.times_instructions_read = 0;
        loop {
            self.state.times_instructions_read += 1;
            let attempt = self.state.times_instructions_read;

            proceed!(screen(
                dev,
                &render(&Message::BlockInstructions {
                    block_number: block.index,
                    block_type: block.block_type,
                    stimuli: block.stimuli,
                })
            )?);
            proceed!(screen(
                dev,
                &render(&Message::Overview {
                    block_type: block.block_type,
                    stimuli: block.stimuli,
                })
            )?);
            if attempt == 1 {
                proceed!(screen(dev, &render(&Message::QuestionnaireIntro))?);
            }

            let passed = proceed!(check.ask(dev)?);
            sink.append_marker(&BlockMarker {
                participant_nr: self.participant.number,
                block_index: block.index,
                block_type: block.block_type,
                attempt,
                passed,
            })?;
            info!(block = block.index, attempt, passed, "comprehension check");

            if passed {
                return Ok(Flow::Continue(()));
            }
            self.state.comprehension_retries += 1;
            proceed!(screen(dev, &render(&Message::QuestionWrong))?);
        }
    }

    fn run_block<D: Devices + ?Sized>(
        &mut self,
        dev: &mut D,
        sink: &mut dyn ResultSink,
        block: &Block,
    ) -> Result<Flow<()>> {
        let ctx = RowContext {
            participant: &self.participant,
            block_index: block.index,
            times_instructions_read: self.state.times_instructions_read,
        };
        for (i, trial) in block.trials.iter().enumerate() {
            let result = proceed!(self.executor.run_trial(
                dev,
                trial,
                i + 1,
                &ctx,
                &mut self.state,
                &mut self.rng,
                sink,
            )?);
            debug!(
                block = block.index,
                trial = i + 1,
                accuracy = result.outcome.accuracy,
                feedback = result.outcome.feedback.label(),
                score = self.state.total_score,
                "trial logged"
            );
        }
        Ok(Flow::Continue(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShuffleMode;
    use crate::error::ExperimentError;
    use crate::participant::Gender;

    fn participant(number: u32) -> ParticipantInfo {
        ParticipantInfo {
            number,
            gender: Gender::Other,
            age: 30,
            color_blind: None,
        }
    }

    #[test]
    fn invalid_trial_count_fails_before_allocation() {
        let cfg = ExperimentConfig {
            trials_per_block: 7,
            shuffle: ShuffleMode::Global,
            ..ExperimentConfig::default()
        };
        assert!(matches!(
            Session::new(cfg, participant(1)),
            Err(ExperimentError::Configuration(_))
        ));
    }

    #[test]
    fn fresh_session_has_no_rows() {
        let cfg = ExperimentConfig {
            seed: Some(3),
            ..ExperimentConfig::default()
        };
        let s = Session::new(cfg, participant(2)).unwrap();
        assert_eq!(s.state().rows_written, 0);
        assert_eq!(s.participant().number, 2);
    }
}
