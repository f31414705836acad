use std::path::PathBuf;
use thiserror::Error;

/// Failures while turning timestamp text into seconds. Always row-local.
#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("empty timestamp text")]
    Empty,

    #[error("negative timestamp: {0:?}")]
    Negative(String),

    #[error("unrecognized timestamp format: {0:?}")]
    Unrecognized(String),
}

/// Structural problems with the event workbook. A missing required column
/// aborts that sheet; selection and workbook-open problems abort the run.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to open workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("failed to read sheet {sheet:?}: {source}")]
    Sheet {
        sheet: String,
        #[source]
        source: calamine::Error,
    },

    #[error("sheet {sheet:?} has no recognized video-name column (expected one of: {expected})")]
    MissingVideoColumn { sheet: String, expected: String },

    #[error("sheet {sheet:?} has no recognized timestamp column (expected one of: {expected})")]
    MissingTimestampColumn { sheet: String, expected: String },

    #[error("invalid sheet selection {selector:?}: {reason}")]
    SheetSelection { selector: String, reason: String },
}

/// Failures while probing or cutting a single snippet. Row-local: the
/// orchestrator records the reason and moves on to the next row.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("degenerate interval [{start:.3}s, {end:.3}s], shorter than {min:.1}s")]
    DegenerateInterval { start: f64, end: f64, min: f64 },

    #[error("cutter exited with status {status}: {stderr}")]
    Cutter { status: i32, stderr: String },

    #[error("cutter timed out after {0}s")]
    Timeout(u64),

    #[error("cutter reported success but no output exists at {0}")]
    MissingOutput(PathBuf),

    #[error("duration probe failed for {path}: {reason}")]
    Probe { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
