// src/bin/simulate_sessions.rs
//
// Monte Carlo harness: runs many simulated participants through full
// sessions on the virtual-clock rig.
//
// Goals:
// - Deterministic multi-run evaluation using seed offsets (run i uses seed + i
//   and participant number i + 1, so block order alternates).
// - Check the empirical favorable-feedback rate per (accuracy × incentive)
//   cell against the configured feedback validity.
//
// Run examples:
//   cargo run --bin simulate_sessions -- --runs 200 --seed 7
//   cargo run --bin simulate_sessions -- --runs 500 --p-press-go 0.8 --p-press-nogo 0.3 --csv runs.csv --quiet

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use gonogo::metrics::{p05_p50_p95, OnlineStats};
use gonogo::{
    init_tracing, ExperimentConfig, FeedbackTally, Gender, Incentive, NoopSink, ParticipantInfo,
    ResponsePolicy, Session, SessionOutcome, SimRig,
};

#[derive(Parser, Debug)]
#[command(name = "simulate_sessions", about = "Monte Carlo harness for the Go/NoGo session")]
struct Args {
    /// Number of simulated sessions.
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..))]
    runs: u64,

    /// Base seed. Run i uses seed + i.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    #[arg(long)]
    trials_per_block: Option<usize>,

    /// Probability of pressing for the go shape.
    #[arg(long, default_value_t = 0.9)]
    p_press_go: f64,

    /// Probability of pressing for the no-go shape.
    #[arg(long, default_value_t = 0.1)]
    p_press_nogo: f64,

    /// Write one CSV row per run to PATH.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Suppress per-run lines; only print the final summary.
    #[arg(long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    // Per-trial logs would drown the summary; RUST_LOG still wins.
    init_tracing(false, None);

    let mut base = ExperimentConfig::from_env_or_default();
    if let Some(n) = args.trials_per_block {
        base.trials_per_block = n;
    }
    base.validate()?;

    let mut csv = match &args.csv {
        Some(path) => {
            let f = File::create(path)
                .with_context(|| format!("cannot create CSV file {}", path.display()))?;
            let mut w = BufWriter::new(f);
            writeln!(w, "run,seed,participant,score,n_correct,n_trials,percent_correct,mean_rt_s")?;
            Some(w)
        }
        None => None,
    };

    println!(
        "gonogo-sim v{} | runs={} seed={} trials_per_block={} validity={} p_go={} p_nogo={} csv={}",
        env!("CARGO_PKG_VERSION"),
        args.runs,
        args.seed,
        base.trials_per_block,
        base.feedback_validity,
        args.p_press_go,
        args.p_press_nogo,
        args.csv
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string())
    );

    let mut score_stats = OnlineStats::default();
    let mut score_samples = Vec::with_capacity(args.runs as usize);
    let mut pct_samples = Vec::with_capacity(args.runs as usize);
    let mut tally = FeedbackTally::default();

    for i in 0..args.runs {
        let run_seed = args.seed.wrapping_add(i);
        let participant = ParticipantInfo {
            number: (i + 1) as u32,
            gender: Gender::Undisclosed,
            age: 0,
            color_blind: None,
        };
        let cfg = ExperimentConfig {
            seed: Some(run_seed),
            ..base.clone()
        };

        let mut session = Session::new(cfg, participant)?;
        let mut rig = SimRig::new(run_seed)
            .with_frame_recording(false)
            .with_responses(ResponsePolicy::Participant {
                p_press_go: args.p_press_go,
                p_press_nogo: args.p_press_nogo,
                rt_range_ms: (250, 800),
            });

        let summary = match session.run(&mut rig, &mut NoopSink)? {
            SessionOutcome::Completed(summary) => summary,
            SessionOutcome::Aborted { rows_written } => {
                anyhow::bail!("simulated run {} aborted after {rows_written} rows", i + 1)
            }
        };
        tally.merge(&session.state().feedback_tally);

        score_stats.add(summary.total_score as f64);
        score_samples.push(summary.total_score as f64);
        pct_samples.push(summary.percent_correct);

        if let Some(w) = csv.as_mut() {
            writeln!(
                w,
                "{},{},{},{},{},{},{:.4},{}",
                i + 1,
                run_seed,
                i + 1,
                summary.total_score,
                summary.n_correct,
                summary.n_trials,
                summary.percent_correct,
                summary
                    .mean_response_time_s
                    .map(|x| format!("{x:.4}"))
                    .unwrap_or_default()
            )?;
        }

        if !args.quiet {
            println!(
                "run {:>4}/{:<4} seed={:<10} score={:>6} correct={:>6.2}%",
                i + 1,
                args.runs,
                run_seed,
                summary.total_score,
                summary.percent_correct
            );
        }
    }
    if let Some(w) = csv.as_mut() {
        w.flush()?;
    }

    let (s05, s50, s95) = p05_p50_p95(score_samples);
    let (c05, c50, c95) = p05_p50_p95(pct_samples);

    println!();
    println!("SUMMARY");
    println!("  runs:            {}", args.runs);
    println!(
        "  score:           mean={:.2}  std={:.2}  min={:.0}  max={:.0}  p05={:.1}  p50={:.1}  p95={:.1}",
        score_stats.mean(),
        score_stats.stddev_sample(),
        score_stats.min(),
        score_stats.max(),
        s05,
        s50,
        s95
    );
    println!("  percent_correct: p05={c05:.2}  p50={c50:.2}  p95={c95:.2}");
    println!(
        "  favorable feedback rate (expected {:.2} accurate / {:.2} inaccurate):",
        base.feedback_validity,
        1.0 - base.feedback_validity
    );
    for accuracy in [true, false] {
        for incentive in [Incentive::Reward, Incentive::Punishment] {
            let (fav, n) = tally.get(accuracy, incentive);
            let rate = tally
                .favorable_rate(accuracy, incentive)
                .map(|r| format!("{r:.4}"))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "    {:<10} {:<10} rate={}  ({} / {})",
                if accuracy { "accurate" } else { "inaccurate" },
                incentive.as_str(),
                rate,
                fav,
                n
            );
        }
    }
    Ok(())
}
