use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Ledger key: the matched video path plus the event time rounded to whole
/// milliseconds. Millisecond rounding absorbs float round-trip error from
/// parsing the same text twice without conflating genuinely distinct events.
pub type LedgerKey = (PathBuf, u64);

pub fn ledger_key(video_path: &Path, event_time_seconds: f64) -> LedgerKey {
    (
        video_path.to_path_buf(),
        (event_time_seconds * 1000.0).round() as u64,
    )
}

/// How an attempted extraction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOutcome {
    Completed,
    Skipped,
    Failed,
}

/// Tracks which (video, event-time) pairs have already produced output, so
/// duplicate rows within a run are skipped. Append-only for the duration of
/// a run: the first recorded outcome for a key wins.
#[derive(Debug, Default)]
pub struct ProcessingLedger {
    entries: HashMap<LedgerKey, LedgerOutcome>,
}

impl ProcessingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when this (video, event-time) pair already produced a snippet
    /// (or was already found on disk) earlier in the run.
    pub fn is_done(&self, video_path: &Path, event_time_seconds: f64) -> bool {
        matches!(
            self.entries.get(&ledger_key(video_path, event_time_seconds)),
            Some(LedgerOutcome::Completed) | Some(LedgerOutcome::Skipped)
        )
    }

    pub fn record(&mut self, video_path: &Path, event_time_seconds: f64, outcome: LedgerOutcome) {
        self.entries
            .entry(ledger_key(video_path, event_time_seconds))
            .or_insert(outcome);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
