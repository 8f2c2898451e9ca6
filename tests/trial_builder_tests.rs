use std::collections::HashSet;
use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use gonogo::config::{ExperimentConfig, ShuffleMode};
use gonogo::stimulus::StimulusPools;
use gonogo::trials::{cell_counts, TrialSetBuilder};
use gonogo::types::BlockType;
use gonogo::ExperimentError;

fn pools_for(cfg: &ExperimentConfig, rng: &mut ChaCha8Rng) -> StimulusPools {
    StimulusPools::new(&cfg.shape_catalogue, &cfg.color_catalogue, rng)
}

#[test]
fn eight_trials_give_two_of_each_cell() {
    let cfg = ExperimentConfig {
        trials_per_block: 8,
        fixation_range_ms: (750, 1250),
        ..ExperimentConfig::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let mut pools = pools_for(&cfg, &mut rng);
    let builder = TrialSetBuilder::new(&cfg).unwrap();

    let block = builder
        .build(1, BlockType::Congruent, &mut pools, &mut rng)
        .unwrap();

    assert_eq!(block.trials.len(), 8);
    assert_eq!(cell_counts(&block.trials), [2, 2, 2, 2]);
}

#[test]
fn every_shuffle_mode_keeps_quartile_balance() {
    for shuffle in [ShuffleMode::Global, ShuffleMode::Chunk4, ShuffleMode::Chunk8] {
        for seed in 0..20 {
            let cfg = ExperimentConfig {
                trials_per_block: 48,
                shuffle,
                ..ExperimentConfig::default()
            };
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut pools = pools_for(&cfg, &mut rng);
            let block = TrialSetBuilder::new(&cfg)
                .unwrap()
                .build(1, BlockType::Incongruent, &mut pools, &mut rng)
                .unwrap();
            assert_eq!(
                cell_counts(&block.trials),
                [12, 12, 12, 12],
                "mode {} seed {seed}",
                shuffle.as_str()
            );
        }
    }
}

#[test]
fn fixation_durations_stay_inside_range() {
    let cfg = ExperimentConfig {
        trials_per_block: 160,
        fixation_range_ms: (750, 1250),
        ..ExperimentConfig::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut pools = pools_for(&cfg, &mut rng);
    let block = TrialSetBuilder::new(&cfg)
        .unwrap()
        .build(1, BlockType::Congruent, &mut pools, &mut rng)
        .unwrap();

    let lo = Duration::from_millis(750);
    let hi = Duration::from_millis(1250);
    assert!(block.trials.iter().all(|t| t.fixation >= lo && t.fixation <= hi));

    // Drawn per trial, not one value for the whole block.
    let distinct: HashSet<_> = block.trials.iter().map(|t| t.fixation).collect();
    assert!(distinct.len() > 10);
}

#[test]
fn degenerate_fixation_range_is_constant() {
    let cfg = ExperimentConfig {
        trials_per_block: 8,
        fixation_range_ms: (900, 900),
        ..ExperimentConfig::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut pools = pools_for(&cfg, &mut rng);
    let block = TrialSetBuilder::new(&cfg)
        .unwrap()
        .build(1, BlockType::Congruent, &mut pools, &mut rng)
        .unwrap();
    assert!(block
        .trials
        .iter()
        .all(|t| t.fixation == Duration::from_millis(900)));
}

#[test]
fn blocks_never_share_shapes_or_colors() {
    for seed in 0..50 {
        let cfg = ExperimentConfig {
            trials_per_block: 8,
            ..ExperimentConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut pools = pools_for(&cfg, &mut rng);
        let builder = TrialSetBuilder::new(&cfg).unwrap();

        let a = builder
            .build(1, BlockType::Congruent, &mut pools, &mut rng)
            .unwrap();
        let b = builder
            .build(2, BlockType::Incongruent, &mut pools, &mut rng)
            .unwrap();

        let shapes_a: HashSet<_> = a.trials.iter().map(|t| t.shape).collect();
        let shapes_b: HashSet<_> = b.trials.iter().map(|t| t.shape).collect();
        let colors_a: HashSet<_> = a.trials.iter().map(|t| t.color).collect();
        let colors_b: HashSet<_> = b.trials.iter().map(|t| t.color).collect();

        assert_eq!(shapes_a.len(), 2);
        assert_eq!(colors_a.len(), 2);
        assert!(shapes_a.is_disjoint(&shapes_b));
        assert!(colors_a.is_disjoint(&colors_b));
    }
}

#[test]
fn third_block_exhausts_the_default_pools() {
    let cfg = ExperimentConfig {
        trials_per_block: 8,
        ..ExperimentConfig::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut pools = pools_for(&cfg, &mut rng);
    let builder = TrialSetBuilder::new(&cfg).unwrap();

    builder.build(1, BlockType::Congruent, &mut pools, &mut rng).unwrap();
    builder.build(2, BlockType::Incongruent, &mut pools, &mut rng).unwrap();
    let err = builder
        .build(3, BlockType::Congruent, &mut pools, &mut rng)
        .unwrap_err();
    assert!(matches!(
        err,
        ExperimentError::PoolExhausted {
            pool: "shape",
            requested: 2,
            remaining: 0
        }
    ));
}

#[test]
fn seven_trials_rejected_before_any_allocation() {
    let cfg = ExperimentConfig {
        trials_per_block: 7,
        shuffle: ShuffleMode::Global,
        ..ExperimentConfig::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let pools = pools_for(&cfg, &mut rng);

    assert!(matches!(
        TrialSetBuilder::new(&cfg),
        Err(ExperimentError::Configuration(_))
    ));
    assert_eq!(pools.shapes.remaining(), 4);
    assert_eq!(pools.colors.remaining(), 4);
}

#[test]
fn same_seed_same_sequence() {
    let cfg = ExperimentConfig {
        trials_per_block: 32,
        ..ExperimentConfig::default()
    };
    let run = || {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut pools = pools_for(&cfg, &mut rng);
        TrialSetBuilder::new(&cfg)
            .unwrap()
            .build(1, BlockType::Congruent, &mut pools, &mut rng)
            .unwrap()
            .trials
    };
    assert_eq!(run(), run());
}
