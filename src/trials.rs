// src/trials.rs
//
// Trial set builder: turns block parameters into a balanced, randomized,
// fully specified trial sequence.
//
//   1) allocate one Go shape, one NoGo shape, one reward color and one
//      punishment color from the session pools,
//   2) build the 4-cell factorial set {Go, NoGo} × {reward, punishment},
//   3) replicate it up to the block length,
//   4) draw each trial's fixation duration (before any shuffle),
//   5) shuffle according to ShuffleMode.

use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::config::{ExperimentConfig, ShuffleMode, CELLS_PER_BLOCK};
use crate::error::{ExperimentError, Result};
use crate::stimulus::{ColorId, ShapeKind, StimulusPools};
use crate::types::{BlockType, Incentive, Response};

/// One fully specified trial. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialSpec {
    pub block_type: BlockType,
    pub shape: ShapeKind,
    pub correct_response: Response,
    pub color: ColorId,
    pub incentive: Incentive,
    /// Fixation cross duration, fixed at construction time.
    #[serde(serialize_with = "serialize_secs")]
    pub fixation: Duration,
    /// 1-based position within its pre-shuffle chunk (diagnostic only).
    pub sequence_tag: Option<u32>,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Stimulus assignment of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockStimuli {
    pub go_shape: ShapeKind,
    pub nogo_shape: ShapeKind,
    pub reward_color: ColorId,
    pub punishment_color: ColorId,
}

impl BlockStimuli {
    pub fn shape_for(&self, response: Response) -> ShapeKind {
        match response {
            Response::Go => self.go_shape,
            Response::NoGo => self.nogo_shape,
        }
    }

    pub fn color_for(&self, incentive: Incentive) -> ColorId {
        match incentive {
            Incentive::Reward => self.reward_color,
            Incentive::Punishment => self.punishment_color,
        }
    }
}

/// A framed block: stimulus assignment plus its trials in execution order.
#[derive(Debug, Clone)]
pub struct Block {
    pub index: usize,
    pub block_type: BlockType,
    pub stimuli: BlockStimuli,
    pub trials: Vec<TrialSpec>,
}

/// Canonical cell order inside one replication of the factorial set.
const CELLS: [(Response, Incentive); CELLS_PER_BLOCK] = [
    (Response::Go, Incentive::Reward),
    (Response::NoGo, Incentive::Punishment),
    (Response::NoGo, Incentive::Reward),
    (Response::Go, Incentive::Punishment),
];

/// Stateless builder; the pools and RNG are passed in explicitly.
#[derive(Debug, Clone)]
pub struct TrialSetBuilder {
    trials_per_block: usize,
    fixation_range_ms: (u64, u64),
    shuffle: ShuffleMode,
}

impl TrialSetBuilder {
    /// Builder for a validated configuration.
    pub fn new(cfg: &ExperimentConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            trials_per_block: cfg.trials_per_block,
            fixation_range_ms: cfg.fixation_range_ms,
            shuffle: cfg.shuffle,
        })
    }

    pub fn trials_per_block(&self) -> usize {
        self.trials_per_block
    }

    pub fn build<R: Rng + ?Sized>(
        &self,
        index: usize,
        block_type: BlockType,
        pools: &mut StimulusPools,
        rng: &mut R,
    ) -> Result<Block> {
        let g = self.shuffle.granularity();
        if self.trials_per_block == 0 || self.trials_per_block % g != 0 {
            return Err(ExperimentError::config(format!(
                "trials_per_block = {} is not a multiple of {g}",
                self.trials_per_block
            )));
        }

        let shapes = pools.shapes.allocate(2)?;
        let colors = pools.colors.allocate(2)?;
        let stimuli = BlockStimuli {
            go_shape: shapes[0],
            nogo_shape: shapes[1],
            reward_color: colors[0],
            punishment_color: colors[1],
        };

        let (lo, hi) = self.fixation_range_ms;
        let mut trials: Vec<TrialSpec> = (0..self.trials_per_block)
            .map(|i| {
                let (correct_response, incentive) = CELLS[i % CELLS_PER_BLOCK];
                TrialSpec {
                    block_type,
                    shape: stimuli.shape_for(correct_response),
                    correct_response,
                    color: stimuli.color_for(incentive),
                    incentive,
                    fixation: Duration::from_millis(rng.gen_range(lo..=hi)),
                    sequence_tag: Some((i % g) as u32 + 1),
                }
            })
            .collect();

        match self.shuffle {
            ShuffleMode::Global => trials.shuffle(rng),
            ShuffleMode::Chunk4 | ShuffleMode::Chunk8 => {
                for chunk in trials.chunks_mut(g) {
                    chunk.shuffle(rng);
                }
            }
        }

        Ok(Block {
            index,
            block_type,
            stimuli,
            trials,
        })
    }
}

/// Count of each (correct_response, incentive) cell, in `CELLS` order.
pub fn cell_counts(trials: &[TrialSpec]) -> [usize; CELLS_PER_BLOCK] {
    let mut counts = [0; CELLS_PER_BLOCK];
    for t in trials {
        if let Some(i) = CELLS
            .iter()
            .position(|&c| c == (t.correct_response, t.incentive))
        {
            counts[i] += 1;
        }
    }
    counts
}
