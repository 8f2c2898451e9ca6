// src/main.rs
//
// Thin harness around the gonogo library.
// All of the real logic lives in the lib crate (trials, executor, session).

use std::fs::{self, File};
use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use gonogo::io::terminal::{PromptMetadata, TerminalRig};
use gonogo::{
    init_tracing, CsvSink, ExperimentConfig, FixedMetadata, JsonlSink, MetadataSource,
    ParticipantInfo, ResponsePolicy, ResultSink, ResultsFormat, Session, SessionOutcome, SimRig,
};

/// Command-line arguments for the experiment binary.
#[derive(Parser, Debug)]
#[command(name = "gonogo", about = "Go/NoGo action-valence framing experiment")]
struct Cli {
    /// Participant number (parity picks the first block's framing).
    /// Prompted for on the terminal when absent.
    #[arg(long)]
    participant: Option<String>,

    #[arg(long, default_value = "undisclosed")]
    gender: String,

    #[arg(long)]
    age: Option<String>,

    #[arg(long)]
    color_blind: Option<bool>,

    /// RNG seed; OS entropy when absent.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    trials_per_block: Option<usize>,

    /// Verbose diagnostics and a separate developer data file.
    #[arg(long)]
    devstats: bool,

    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Results format: jsonl | csv.
    #[arg(long)]
    format: Option<String>,

    /// Run a simulated participant instead of the terminal front end.
    #[arg(long)]
    simulate: bool,
}

/// Defaults, then GONOGO_* env overrides, then CLI flags.
fn build_config_from_env_and_args(cli: &Cli) -> anyhow::Result<ExperimentConfig> {
    let mut cfg = ExperimentConfig::from_env_or_default();

    if let Some(seed) = cli.seed {
        cfg.seed = Some(seed);
    }
    if let Some(n) = cli.trials_per_block {
        cfg.trials_per_block = n;
    }
    if cli.devstats {
        cfg.devstats = true;
    }
    if let Some(dir) = &cli.data_dir {
        cfg.data_dir = dir.clone();
    }
    if let Some(raw) = &cli.format {
        cfg.results_format = ResultsFormat::parse(raw)
            .with_context(|| format!("unknown results format {raw:?}"))?;
    }

    cfg.validate()?;
    Ok(cfg)
}

fn collect_participant(cli: &Cli) -> anyhow::Result<ParticipantInfo> {
    let mut source: Box<dyn MetadataSource> = match (&cli.participant, &cli.age) {
        (Some(number), Some(age)) => Box::new(FixedMetadata(ParticipantInfo::parse(
            number,
            &cli.gender,
            age,
            cli.color_blind,
        )?)),
        (None, None) => Box::new(PromptMetadata::new(
            io::stdin().lock(),
            io::stdout(),
            cli.color_blind,
        )),
        _ => bail!("--participant and --age must be given together"),
    };
    Ok(source.collect()?)
}

fn build_sink(cfg: &ExperimentConfig, participant: u32) -> anyhow::Result<Box<dyn ResultSink>> {
    let path = cfg.results_path(participant);
    let context = || format!("cannot create results file {}", path.display());
    let sink: Box<dyn ResultSink> = match cfg.results_format {
        ResultsFormat::Jsonl => Box::new(JsonlSink::create(&path).with_context(context)?),
        ResultsFormat::Csv => Box::new(CsvSink::create(&path).with_context(context)?),
    };
    info!(path = %path.display(), "writing results");
    Ok(sink)
}

fn main() -> anyhow::Result<()> {
    // 0) Parse CLI args.
    let cli = Cli::parse();

    // 1) Diagnostics: the terminal front end owns the screen, so logs go to
    //    a file next to the data; simulated runs log to stderr.
    let early_cfg = ExperimentConfig::from_env_or_default();
    let data_dir = cli.data_dir.clone().unwrap_or(early_cfg.data_dir);
    let log_file = if cli.simulate {
        None
    } else {
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("cannot create {}", data_dir.display()))?;
        Some(File::options().create(true).append(true).open(data_dir.join("gonogo.log"))?)
    };
    init_tracing(cli.devstats || early_cfg.devstats, log_file);

    // 2) Config with env + CLI overrides; fails before anything is allocated.
    let cfg = build_config_from_env_and_args(&cli)?;

    // 3) Participant metadata (validated numeric number / age).
    let participant = collect_participant(&cli)?;

    // 4) Results sink; never overwrites an existing data file.
    let mut sink = build_sink(&cfg, participant.number)?;

    // 5) Run the session on the chosen front end.
    let seed = cfg.seed.unwrap_or(0);
    let mut session = Session::new(cfg, participant)?;
    let outcome = if cli.simulate {
        let mut rig = SimRig::new(seed).with_responses(ResponsePolicy::Participant {
            p_press_go: 0.9,
            p_press_nogo: 0.15,
            rt_range_ms: (300, 700),
        });
        session.run(&mut rig, sink.as_mut())?
    } else {
        let mut rig = TerminalRig::new()?;
        session.run(&mut rig, sink.as_mut())?
    };

    match outcome {
        SessionOutcome::Completed(summary) => {
            println!(
                "Session completed: score {} ({} / {} correct, {:.1}%)",
                summary.total_score, summary.n_correct, summary.n_trials, summary.percent_correct
            );
        }
        SessionOutcome::Aborted { rows_written } => {
            println!("Session aborted after {rows_written} trials; partial data kept.");
        }
    }
    Ok(())
}
