//! Go/NoGo framing experiment core library.
//!
//! This crate exposes the trial generation, the trial timing state machine,
//! the probabilistic feedback engine and the session controller. The
//! binaries (`src/main.rs`, `src/bin/simulate_sessions.rs`) are thin
//! harnesses that pick a front end and a results sink.

pub mod types;

pub mod comprehension;
pub mod config;
pub mod devstats;
pub mod error;
pub mod executor;
pub mod io;
pub mod logging;
pub mod messages;
pub mod metrics;
pub mod outcome;
pub mod participant;
pub mod session;
pub mod state;
pub mod stimulus;
pub mod trials;

// --- Re-exports for ergonomic external use ---------------------------------

pub use config::{ExperimentConfig, ResultsFormat, ShuffleMode};
pub use error::{ExperimentError, Result};

pub use comprehension::{ComprehensionCheck, Question, QuestionKind, Respondent};

pub use executor::{RowContext, TrialExecutor, TrialPhase, TrialResult, TrialTiming};

pub use io::sim::{AbortAt, OracleRespondent, ResponsePolicy, ScriptedRespondent, SimResponse, SimRig};
pub use io::{Devices, InputDevice, Presenter, VisualElement};

pub use logging::{init_tracing, BlockMarker, CsvSink, JsonlSink, MemorySink, NoopSink, ResultRow, ResultSink};

pub use outcome::{Outcome, OutcomeEngine};

pub use participant::{FixedMetadata, Gender, MetadataSource, ParticipantInfo};

pub use session::{Session, SessionOutcome};

pub use state::{FeedbackTally, SessionState, SessionSummary};

pub use stimulus::{ColorId, ShapeKind, StimulusPools};

pub use trials::{Block, BlockStimuli, TrialSetBuilder, TrialSpec};

pub use types::{BlockType, Feedback, Flow, Incentive, Key, Response};
