//! Event Snippet Extractor
//!
//! Batch pipeline that reads timestamped events from a spreadsheet, matches
//! each event to a video file on disk, and losslessly cuts a sub-clip around
//! the event time. Re-runs are idempotent: existing snippets are skipped,
//! never overwritten.

pub mod config;
pub mod error;
pub mod events;
pub mod extract;
pub mod ledger;
pub mod locate;
pub mod pipeline;
pub mod probe;
pub mod report;
pub mod timestamp;

// Re-export main types for easy access
pub use crate::config::Config;
pub use crate::error::{ExtractError, SchemaError, TimestampError};
pub use crate::events::{Classification, EventRow, LoadedEvents, SheetSelection};
pub use crate::extract::{FfmpegCutter, MediaCutter, SnippetExtractor, SnippetOutput};
pub use crate::ledger::{LedgerOutcome, ProcessingLedger};
pub use crate::locate::{MatchResult, MatchStatus, VideoFileRecord};
pub use crate::pipeline::{Pipeline, RunSummary};
pub use crate::probe::{DurationCache, DurationProber, FfprobeProber};
pub use crate::report::ReportWriter;
pub use crate::timestamp::parse_timestamp;
