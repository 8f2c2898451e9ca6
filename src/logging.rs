// src/logging.rs
//
// Result sinks and diagnostic logging.
// - ResultSink: trait used by the trial executor / session controller
// - NoopSink:   discards everything (batch simulation)
// - MemorySink: keeps rows in memory (tests)
// - JsonlSink:  one JSON object per line
// - CsvSink:    header + one comma-separated line per record
//
// File sinks flush after every append, so an aborted session leaves a
// valid partial file behind.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use crate::error::Result;
use crate::participant::Gender;
use crate::stimulus::{ColorId, ShapeKind};
use crate::types::{BlockType, Feedback, Incentive, Response};

/// One completed trial. Emitted once, never revisited.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub participant_nr: u32,
    pub participant_gender: Gender,
    pub participant_age: u32,
    pub colorblind: Option<bool>,
    /// 1-based block position in the session.
    pub block_index: usize,
    pub block_type: BlockType,
    /// 1-based trial position in the block.
    pub trial_index: usize,
    pub shape: ShapeKind,
    pub color: ColorId,
    pub incentive: Incentive,
    pub correct_response: Response,
    pub given_response: Response,
    pub accuracy: bool,
    pub feedback: Feedback,
    pub correct_feedback: Feedback,
    /// Seconds since stimulus onset; None without a response inside the
    /// deadline.
    pub response_time: Option<f64>,
    pub fixation_duration: f64,
    pub sequence_tag: Option<u32>,
    pub times_instructions_read: u32,
    pub total_score: i64,
}

/// Outcome of one comprehension-check attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockMarker {
    pub participant_nr: u32,
    pub block_index: usize,
    pub block_type: BlockType,
    /// 1-based attempt number (= times the instructions were read).
    pub attempt: u32,
    pub passed: bool,
}

/// Append-only results table.
pub trait ResultSink {
    fn append_row(&mut self, row: &ResultRow) -> Result<()>;
    fn append_marker(&mut self, marker: &BlockMarker) -> Result<()>;
}

/// Sink that discards all records.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ResultSink for NoopSink {
    fn append_row(&mut self, _row: &ResultRow) -> Result<()> {
        Ok(())
    }

    fn append_marker(&mut self, _marker: &BlockMarker) -> Result<()> {
        Ok(())
    }
}

/// In-memory sink.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub rows: Vec<ResultRow>,
    pub markers: Vec<BlockMarker>,
}

impl ResultSink for MemorySink {
    fn append_row(&mut self, row: &ResultRow) -> Result<()> {
        self.rows.push(row.clone());
        Ok(())
    }

    fn append_marker(&mut self, marker: &BlockMarker) -> Result<()> {
        self.markers.push(marker.clone());
        Ok(())
    }
}

/// Refuses to clobber an existing results file.
fn create_new(path: &Path) -> io::Result<BufWriter<File>> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    Ok(BufWriter::new(file))
}

#[derive(Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum Record<'a> {
    Trial(&'a ResultRow),
    Block(&'a BlockMarker),
}

/// JSONL file sink: `{"record":"trial",...}` / `{"record":"block",...}`.
pub struct JsonlSink {
    writer: BufWriter<File>,
}

impl JsonlSink {
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self {
            writer: create_new(path)?,
        })
    }

    fn write(&mut self, record: &Record<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl ResultSink for JsonlSink {
    fn append_row(&mut self, row: &ResultRow) -> Result<()> {
        self.write(&Record::Trial(row))
    }

    fn append_marker(&mut self, marker: &BlockMarker) -> Result<()> {
        self.write(&Record::Block(marker))
    }
}

pub const CSV_COLUMNS: [&str; 22] = [
    "record",
    "participant_nr",
    "participant_gender",
    "participant_age",
    "colorblind",
    "block_index",
    "block_type",
    "trial_index",
    "shape",
    "color",
    "incentive",
    "correct_response",
    "given_response",
    "accuracy",
    "feedback",
    "correct_feedback",
    "response_time",
    "fixation_duration",
    "sequence_tag",
    "times_instructions_read",
    "total_score",
    "passed",
];

/// CSV file sink. Block markers share the trial columns; cells that do not
/// apply stay empty.
pub struct CsvSink {
    writer: BufWriter<File>,
}

impl CsvSink {
    pub fn create(path: &Path) -> Result<Self> {
        let mut writer = create_new(path)?;
        writeln!(writer, "{}", CSV_COLUMNS.join(","))?;
        writer.flush()?;
        Ok(Self { writer })
    }

    fn write_line(&mut self, cells: &[String]) -> Result<()> {
        let line: Vec<String> = cells.iter().map(|c| csv_escape(c)).collect();
        writeln!(self.writer, "{}", line.join(","))?;
        self.writer.flush()?;
        Ok(())
    }
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

fn csv_escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

impl ResultSink for CsvSink {
    fn append_row(&mut self, r: &ResultRow) -> Result<()> {
        let cells = vec![
            "trial".to_string(),
            r.participant_nr.to_string(),
            r.participant_gender.as_str().to_string(),
            r.participant_age.to_string(),
            opt(r.colorblind),
            r.block_index.to_string(),
            r.block_type.as_str().to_string(),
            r.trial_index.to_string(),
            r.shape.name().to_string(),
            r.color.name().to_string(),
            r.incentive.as_str().to_string(),
            r.correct_response.as_str().to_string(),
            r.given_response.as_str().to_string(),
            u8::from(r.accuracy).to_string(),
            r.feedback.label().to_string(),
            r.correct_feedback.label().to_string(),
            opt(r.response_time),
            r.fixation_duration.to_string(),
            opt(r.sequence_tag),
            r.times_instructions_read.to_string(),
            r.total_score.to_string(),
            String::new(),
        ];
        self.write_line(&cells)
    }

    fn append_marker(&mut self, m: &BlockMarker) -> Result<()> {
        let mut cells = vec![String::new(); CSV_COLUMNS.len()];
        cells[0] = "block".to_string();
        cells[1] = m.participant_nr.to_string();
        cells[5] = m.block_index.to_string();
        cells[6] = m.block_type.as_str().to_string();
        cells[19] = m.attempt.to_string();
        cells[21] = u8::from(m.passed).to_string();
        self.write_line(&cells)
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` with devstats.
/// Diagnostics go to `log_file` when given (the terminal front end owns the
/// screen), else to stderr. Calling this twice is harmless.
pub fn init_tracing(devstats: bool, log_file: Option<File>) {
    let default = if devstats { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let writer = match log_file {
        Some(file) => BoxMakeWriter::new(Mutex::new(file)),
        None => BoxMakeWriter::new(io::stderr),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker() -> BlockMarker {
        BlockMarker {
            participant_nr: 3,
            block_index: 1,
            block_type: BlockType::Incongruent,
            attempt: 2,
            passed: true,
        }
    }

    #[test]
    fn jsonl_tags_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data_3.jsonl");
        let mut sink = JsonlSink::create(&path).unwrap();
        sink.append_marker(&marker()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let v: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(v["record"], "block");
        assert_eq!(v["block_type"], "incongruent");
        assert_eq!(v["attempt"], 2);
    }

    #[test]
    fn file_sinks_refuse_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data_3.csv");
        CsvSink::create(&path).unwrap();
        assert!(CsvSink::create(&path).is_err());
        assert!(JsonlSink::create(&path).is_err());
    }

    #[test]
    fn csv_marker_fills_block_columns_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data_3.csv");
        let mut sink = CsvSink::create(&path).unwrap();
        sink.append_marker(&marker()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], CSV_COLUMNS.join(","));
        let cells: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(cells.len(), CSV_COLUMNS.len());
        assert_eq!(cells[0], "block");
        assert_eq!(cells[6], "incongruent");
        assert_eq!(cells[21], "1");
        assert_eq!(cells[14], "");
    }

    #[test]
    fn csv_escape_quotes_separators() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
