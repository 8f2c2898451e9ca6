use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use gonogo::outcome::OutcomeEngine;
use gonogo::state::SessionState;
use gonogo::stimulus::{ColorId, ShapeKind};
use gonogo::trials::TrialSpec;
use gonogo::types::{BlockType, Feedback, Incentive, Response};

const SAMPLES: usize = 10_000;
const TOLERANCE: f64 = 0.02;

fn trial(correct: Response, incentive: Incentive) -> TrialSpec {
    TrialSpec {
        block_type: BlockType::Congruent,
        shape: ShapeKind::Star5,
        correct_response: correct,
        color: ColorId::Purple,
        incentive,
        fixation: Duration::from_millis(1000),
        sequence_tag: None,
    }
}

/// Favorable-outcome frequency for one (accuracy × incentive) cell.
fn favorable_rate(accurate: bool, incentive: Incentive, seed: u64) -> f64 {
    let engine = OutcomeEngine::new(0.8).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    // Go trial: responding is accurate, withholding is not.
    let t = trial(Response::Go, incentive);
    let favorable = (0..SAMPLES)
        .filter(|_| {
            let o = engine.draw(&t, accurate, &mut rng);
            assert_eq!(o.accuracy, accurate);
            o.feedback.is_favorable()
        })
        .count();
    favorable as f64 / SAMPLES as f64
}

#[test]
fn accurate_reward_converges_to_point_eight() {
    let r = favorable_rate(true, Incentive::Reward, 1);
    assert!((r - 0.8).abs() < TOLERANCE, "rate {r}");
}

#[test]
fn inaccurate_reward_converges_to_point_two() {
    let r = favorable_rate(false, Incentive::Reward, 2);
    assert!((r - 0.2).abs() < TOLERANCE, "rate {r}");
}

#[test]
fn accurate_punishment_converges_to_point_eight() {
    let r = favorable_rate(true, Incentive::Punishment, 3);
    assert!((r - 0.8).abs() < TOLERANCE, "rate {r}");
}

#[test]
fn inaccurate_punishment_converges_to_point_two() {
    let r = favorable_rate(false, Incentive::Punishment, 4);
    assert!((r - 0.2).abs() < TOLERANCE, "rate {r}");
}

#[test]
fn go_reward_response_at_400ms() {
    let engine = OutcomeEngine::new(0.8).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(21);
    let t = trial(Response::Go, Incentive::Reward);
    let rt = Duration::from_millis(400);

    let mut plus_ten = 0;
    for _ in 0..SAMPLES {
        let mut state = SessionState::new();
        let o = engine.evaluate(&t, Some(rt), &mut state, &mut rng);
        assert!(o.accuracy);
        assert_eq!(o.given_response, Response::Go);
        assert!(matches!(o.feedback, Feedback::PlusTen | Feedback::PlusOne));
        assert_eq!(o.correct_feedback, Feedback::PlusTen);
        assert_eq!(state.total_score, o.feedback.points());
        assert_eq!(state.n_correct, 1);
        assert!((state.response_times.mean() - 0.4).abs() < 1e-12);
        if o.feedback == Feedback::PlusTen {
            plus_ten += 1;
        }
    }
    let r = plus_ten as f64 / SAMPLES as f64;
    assert!((r - 0.8).abs() < TOLERANCE, "rate {r}");
}

#[test]
fn withheld_nogo_punishment() {
    let engine = OutcomeEngine::new(0.8).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(22);
    let t = trial(Response::NoGo, Incentive::Punishment);

    let mut state = SessionState::new();
    let mut minus_one = 0;
    for _ in 0..SAMPLES {
        let o = engine.evaluate(&t, None, &mut state, &mut rng);
        assert!(o.accuracy);
        assert_eq!(o.given_response, Response::NoGo);
        assert!(matches!(o.feedback, Feedback::MinusOne | Feedback::MinusTen));
        if o.feedback == Feedback::MinusOne {
            minus_one += 1;
        }
    }
    assert_eq!(state.response_times.n(), 0);
    assert_eq!(state.n_correct, SAMPLES as u64);
    let r = minus_one as f64 / SAMPLES as f64;
    assert!((r - 0.8).abs() < TOLERANCE, "rate {r}");

    // Tally agrees with the per-draw count.
    let (fav, n) = state.feedback_tally.get(true, Incentive::Punishment);
    assert_eq!((fav, n), (minus_one as u64, SAMPLES as u64));
}

#[test]
fn same_seed_same_feedback_schedule() {
    let engine = OutcomeEngine::new(0.8).unwrap();
    let t = trial(Response::Go, Incentive::Reward);
    let draw = |seed| {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..100)
            .map(|i| engine.draw(&t, i % 3 == 0, &mut rng).feedback)
            .collect::<Vec<_>>()
    };
    assert_eq!(draw(8), draw(8));
}
