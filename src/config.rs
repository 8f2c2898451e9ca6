// src/config.rs
//
// Central configuration for the experiment runner.
// This is the single source of truth for the factorial design (trial counts,
// stimulus catalogues), the trial timing pipeline and the data-collection
// mode. Defaults reproduce the lab setup; research harnesses override
// individual knobs via GONOGO_* environment variables or CLI flags.

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{ExperimentError, Result};
use crate::stimulus::{ColorId, ShapeKind};

/// Number of framing blocks per session (one congruent, one incongruent).
pub const BLOCKS_PER_SESSION: usize = 2;

/// Factorial cells per block: {Go, NoGo} × {reward, punishment}.
pub const CELLS_PER_BLOCK: usize = 4;

/// How the replicated cell set is randomized.
///
/// - Global = one shuffle of the whole block
/// - Chunk4 = shuffle every consecutive group of 4 trials (one of each cell)
/// - Chunk8 = shuffle every consecutive group of 8 trials (each cell twice)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleMode {
    Global,
    Chunk4,
    Chunk8,
}

impl ShuffleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShuffleMode::Global => "global",
            ShuffleMode::Chunk4 => "chunk4",
            ShuffleMode::Chunk8 => "chunk8",
        }
    }

    /// Parse a mode name (case-insensitive). Returns None if unrecognized.
    pub fn parse(s: &str) -> Option<ShuffleMode> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" | "whole" | "random" => Some(ShuffleMode::Global),
            "chunk4" | "4" | "per4" => Some(ShuffleMode::Chunk4),
            "chunk8" | "8" | "per8" => Some(ShuffleMode::Chunk8),
            _ => None,
        }
    }

    /// The trial count per block must be a multiple of this.
    pub fn granularity(&self) -> usize {
        match self {
            ShuffleMode::Global | ShuffleMode::Chunk4 => CELLS_PER_BLOCK,
            ShuffleMode::Chunk8 => 2 * CELLS_PER_BLOCK,
        }
    }
}

/// On-disk format of the results file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsFormat {
    Jsonl,
    Csv,
}

impl ResultsFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ResultsFormat::Jsonl => "jsonl",
            ResultsFormat::Csv => "csv",
        }
    }

    pub fn parse(s: &str) -> Option<ResultsFormat> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jsonl" | "json" => Some(ResultsFormat::Jsonl),
            "csv" => Some(ResultsFormat::Csv),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    /// Trials per block; a multiple of the shuffle granularity.
    pub trials_per_block: usize,
    /// Inclusive (min, max) fixation duration in milliseconds.
    pub fixation_range_ms: (u64, u64),
    /// Hard response deadline; the stimulus is always visible this long.
    pub response_deadline_s: f64,
    /// Optional "what you did" phase before the points are shown.
    /// 0.0 = single feedback phase.
    pub result_duration_s: f64,
    /// Duration of the feedback display.
    pub feedback_duration_s: f64,
    /// Blank screen between trials.
    pub intertrial_interval_s: f64,
    /// Probability of the favorable outcome after an accurate response
    /// (and of the unfavorable one after an inaccurate response).
    pub feedback_validity: f64,
    pub shuffle: ShuffleMode,
    pub shape_catalogue: Vec<ShapeKind>,
    pub color_catalogue: Vec<ColorId>,
    /// Nominal stimulus size in pixels (geometry only).
    pub stim_size: f64,
    /// RNG seed; None = OS entropy.
    pub seed: Option<u64>,
    /// Verbose diagnostics + separate data file. Must be false for real
    /// data collection.
    pub devstats: bool,
    pub data_dir: PathBuf,
    pub results_format: ResultsFormat,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            trials_per_block: 160,
            fixation_range_ms: (750, 1250),
            response_deadline_s: 1.0,
            result_duration_s: 0.0,
            feedback_duration_s: 1.5,
            intertrial_interval_s: 0.5,
            feedback_validity: 0.8,
            shuffle: ShuffleMode::Chunk8,
            shape_catalogue: vec![
                ShapeKind::Star5,
                ShapeKind::Triangle,
                ShapeKind::Circle,
                ShapeKind::Square,
            ],
            color_catalogue: vec![
                ColorId::Purple,
                ColorId::Blue,
                ColorId::Yellow,
                ColorId::Pink,
            ],
            stim_size: 300.0,
            seed: None,
            devstats: false,
            data_dir: PathBuf::from("data"),
            results_format: ResultsFormat::Jsonl,
        }
    }
}

fn secs(x: f64) -> Duration {
    Duration::try_from_secs_f64(x).unwrap_or(Duration::ZERO)
}

impl ExperimentConfig {
    pub fn response_deadline(&self) -> Duration {
        secs(self.response_deadline_s)
    }

    pub fn result_duration(&self) -> Duration {
        secs(self.result_duration_s)
    }

    pub fn feedback_duration(&self) -> Duration {
        secs(self.feedback_duration_s)
    }

    pub fn intertrial_interval(&self) -> Duration {
        secs(self.intertrial_interval_s)
    }

    /// Reject any configuration that could fail mid-session.
    ///
    /// Runs before the stimulus pools are even built, so a bad trial count
    /// never consumes a shape or color.
    pub fn validate(&self) -> Result<()> {
        let g = self.shuffle.granularity();
        if self.trials_per_block == 0 || self.trials_per_block % g != 0 {
            return Err(ExperimentError::config(format!(
                "trials_per_block = {} must be a positive multiple of {} (shuffle mode {})",
                self.trials_per_block,
                g,
                self.shuffle.as_str()
            )));
        }

        let (lo, hi) = self.fixation_range_ms;
        if lo > hi {
            return Err(ExperimentError::config(format!(
                "fixation_range_ms min {lo} exceeds max {hi}"
            )));
        }

        if !(self.response_deadline_s.is_finite() && self.response_deadline_s > 0.0) {
            return Err(ExperimentError::config(format!(
                "response_deadline_s must be > 0 (got {})",
                self.response_deadline_s
            )));
        }

        for (name, v) in [
            ("result_duration_s", self.result_duration_s),
            ("feedback_duration_s", self.feedback_duration_s),
            ("intertrial_interval_s", self.intertrial_interval_s),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(ExperimentError::config(format!(
                    "{name} must be a non-negative number of seconds (got {v})"
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.feedback_validity) {
            return Err(ExperimentError::config(format!(
                "feedback_validity must lie in [0, 1] (got {})",
                self.feedback_validity
            )));
        }

        // One Go + one NoGo shape, one reward + one punishment color per block.
        let needed = 2 * BLOCKS_PER_SESSION;
        let shapes: HashSet<_> = self.shape_catalogue.iter().collect();
        if shapes.len() != self.shape_catalogue.len() {
            return Err(ExperimentError::config("shape_catalogue contains duplicates"));
        }
        if shapes.len() < needed {
            return Err(ExperimentError::config(format!(
                "shape_catalogue has {} shapes; {} blocks need {}",
                shapes.len(),
                BLOCKS_PER_SESSION,
                needed
            )));
        }
        let colors: HashSet<_> = self.color_catalogue.iter().collect();
        if colors.len() != self.color_catalogue.len() {
            return Err(ExperimentError::config("color_catalogue contains duplicates"));
        }
        if colors.len() < needed {
            return Err(ExperimentError::config(format!(
                "color_catalogue has {} colors; {} blocks need {}",
                colors.len(),
                BLOCKS_PER_SESSION,
                needed
            )));
        }

        Ok(())
    }

    /// Defaults with GONOGO_* environment overrides applied.
    ///
    /// Recognised variables:
    ///   - GONOGO_TRIALS_PER_BLOCK     (usize)
    ///   - GONOGO_FIXATION_MS          ("min,max" in ms)
    ///   - GONOGO_RESPONSE_DEADLINE_S  (f64)
    ///   - GONOGO_RESULT_DURATION_S    (f64)
    ///   - GONOGO_FEEDBACK_DURATION_S  (f64)
    ///   - GONOGO_ITI_S                (f64)
    ///   - GONOGO_SHUFFLE              (global | chunk4 | chunk8)
    ///   - GONOGO_SEED                 (u64)
    ///   - GONOGO_DEVSTATS             (bool)
    ///
    /// Any variable that fails to parse is ignored with a warning.
    pub fn from_env_or_default() -> Self {
        let mut cfg = Self::default();

        override_from_env("GONOGO_TRIALS_PER_BLOCK", &mut cfg.trials_per_block);
        override_from_env("GONOGO_RESPONSE_DEADLINE_S", &mut cfg.response_deadline_s);
        override_from_env("GONOGO_RESULT_DURATION_S", &mut cfg.result_duration_s);
        override_from_env("GONOGO_FEEDBACK_DURATION_S", &mut cfg.feedback_duration_s);
        override_from_env("GONOGO_ITI_S", &mut cfg.intertrial_interval_s);
        override_from_env("GONOGO_DEVSTATS", &mut cfg.devstats);

        if let Ok(raw) = env::var("GONOGO_SEED") {
            match raw.trim().parse::<u64>() {
                Ok(v) => {
                    cfg.seed = Some(v);
                    info!(seed = v, "GONOGO_SEED overrode default");
                }
                Err(_) => warn!(raw = %raw, "could not parse GONOGO_SEED as u64; using entropy"),
            }
        }

        if let Ok(raw) = env::var("GONOGO_FIXATION_MS") {
            match parse_range_ms(&raw) {
                Some(range) => {
                    cfg.fixation_range_ms = range;
                    info!(?range, "GONOGO_FIXATION_MS overrode default");
                }
                None => warn!(
                    raw = %raw,
                    default = ?cfg.fixation_range_ms,
                    "could not parse GONOGO_FIXATION_MS as \"min,max\"; using default"
                ),
            }
        }

        if let Ok(raw) = env::var("GONOGO_SHUFFLE") {
            match ShuffleMode::parse(&raw) {
                Some(mode) => {
                    cfg.shuffle = mode;
                    info!(mode = mode.as_str(), "GONOGO_SHUFFLE overrode default");
                }
                None => warn!(
                    raw = %raw,
                    default = cfg.shuffle.as_str(),
                    "unknown GONOGO_SHUFFLE; using default"
                ),
            }
        }

        cfg
    }

    /// Path of the results file for a participant.
    pub fn results_path(&self, participant_number: u32) -> PathBuf {
        let stem = if self.devstats {
            format!("data_developer_mode_{participant_number}")
        } else {
            format!("data_{participant_number}")
        };
        self.data_dir
            .join(format!("{stem}.{}", self.results_format.extension()))
    }
}

/// Parse "min,max" (also accepts "min-max" and "min..max").
pub fn parse_range_ms(raw: &str) -> Option<(u64, u64)> {
    let raw = raw.trim();
    let (a, b) = raw
        .split_once(',')
        .or_else(|| raw.split_once(".."))
        .or_else(|| raw.split_once('-'))?;
    let lo = a.trim().parse().ok()?;
    let hi = b.trim().parse().ok()?;
    Some((lo, hi))
}

fn override_from_env<T>(name: &str, slot: &mut T)
where
    T: FromStr + std::fmt::Debug,
{
    let Ok(raw) = env::var(name) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(v) => {
            info!(var = name, value = ?v, "environment overrode default");
            *slot = v;
        }
        Err(_) => warn!(
            var = name,
            raw = %raw,
            default = ?slot,
            "could not parse environment override; using default"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ExperimentConfig::default().validate().unwrap();
    }

    #[test]
    fn seven_trials_is_rejected() {
        let cfg = ExperimentConfig {
            trials_per_block: 7,
            shuffle: ShuffleMode::Global,
            ..ExperimentConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ExperimentError::Configuration(_))
        ));
    }

    #[test]
    fn chunk8_requires_multiple_of_eight() {
        let mut cfg = ExperimentConfig {
            trials_per_block: 12,
            shuffle: ShuffleMode::Chunk8,
            ..ExperimentConfig::default()
        };
        assert!(cfg.validate().is_err());

        cfg.shuffle = ShuffleMode::Chunk4;
        cfg.validate().unwrap();
    }

    #[test]
    fn small_catalogue_is_rejected() {
        let cfg = ExperimentConfig {
            color_catalogue: vec![ColorId::Blue, ColorId::Pink, ColorId::Yellow],
            ..ExperimentConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_fixation_range_is_rejected() {
        let cfg = ExperimentConfig {
            fixation_range_ms: (1250, 750),
            ..ExperimentConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn range_parser_accepts_common_separators() {
        assert_eq!(parse_range_ms("750,1250"), Some((750, 1250)));
        assert_eq!(parse_range_ms(" 250 - 2000 "), Some((250, 2000)));
        assert_eq!(parse_range_ms("100..200"), Some((100, 200)));
        assert_eq!(parse_range_ms("abc"), None);
    }

    #[test]
    fn devstats_uses_separate_results_path() {
        let mut cfg = ExperimentConfig::default();
        assert_eq!(
            cfg.results_path(12),
            PathBuf::from("data").join("data_12.jsonl")
        );
        cfg.devstats = true;
        cfg.results_format = ResultsFormat::Csv;
        assert_eq!(
            cfg.results_path(12),
            PathBuf::from("data").join("data_developer_mode_12.csv")
        );
    }
}
