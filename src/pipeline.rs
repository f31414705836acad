use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::events::{load_events, EventRow, LoadedEvents, SheetSelection};
use crate::extract::{ExtractOutcome, MediaCutter, SnippetExtractor};
use crate::ledger::{LedgerOutcome, ProcessingLedger};
use crate::locate::{discover_videos, locate, MatchResult, MatchStatus};
use crate::probe::{DurationCache, DurationProber};
use crate::report::ReportWriter;

/// Final tally of one batch run.
#[derive(Debug)]
pub struct RunSummary {
    pub total_rows: usize,
    pub invalid_rows: usize,
    pub skipped_sheets: usize,
    pub done: usize,
    pub skipped: usize,
    pub not_found: usize,
    pub ambiguous: usize,
    pub failed: usize,
    pub report_path: Option<PathBuf>,
    /// Human-readable reason per failed/ambiguous/not-found row.
    pub problems: Vec<String>,
    pub total_time: Duration,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Drives event rows through locating, the ledger check, and extraction,
/// collecting every outcome into the report. Row failures never abort the
/// run: each row is attempted exactly once and the batch continues.
pub struct Pipeline {
    config: Config,
    extractor: SnippetExtractor,
    durations: DurationCache,
    ledger: ProcessingLedger,
}

impl Pipeline {
    pub fn new(
        config: Config,
        cutter: Box<dyn MediaCutter>,
        prober: Box<dyn DurationProber>,
    ) -> Self {
        let extractor = SnippetExtractor::new(
            config.output.base_dir.clone(),
            config.extraction.lead_seconds,
            config.extraction.trail_seconds,
            config.extraction.min_snippet_seconds,
            cutter,
        );
        Self {
            config,
            extractor,
            durations: DurationCache::new(prober),
            ledger: ProcessingLedger::new(),
        }
    }

    /// Run one batch: load the workbook, discover videos, process every row.
    pub async fn run(
        &mut self,
        events_file: &Path,
        video_dir: &Path,
        sheet_selector: &str,
    ) -> Result<RunSummary> {
        let selection = SheetSelection::parse(sheet_selector)?;
        let loaded = load_events(events_file, &selection, sheet_selector)?;
        self.process_events(loaded, video_dir).await
    }

    /// Process already-loaded event rows against the videos under
    /// `video_dir`.
    pub async fn process_events(
        &mut self,
        loaded: LoadedEvents,
        video_dir: &Path,
    ) -> Result<RunSummary> {
        let start_time = Instant::now();

        tokio::fs::create_dir_all(&self.config.output.base_dir).await?;

        let candidates = discover_videos(video_dir, &self.config.matching.supported_extensions);
        if candidates.is_empty() {
            warn!("No video files found under {}", video_dir.display());
        }

        let mut report = ReportWriter::new();
        for diagnostic in &loaded.diagnostics {
            warn!(
                "Row excluded ({} row {}): {}",
                diagnostic.sheet, diagnostic.row_index, diagnostic.reason
            );
            report.add_invalid_row(diagnostic);
        }

        let mut summary = RunSummary {
            total_rows: loaded.rows.len(),
            invalid_rows: loaded.diagnostics.len(),
            skipped_sheets: loaded.sheet_errors.len(),
            done: 0,
            skipped: 0,
            not_found: 0,
            ambiguous: 0,
            failed: 0,
            report_path: None,
            problems: loaded.sheet_errors.iter().map(|e| e.to_string()).collect(),
            total_time: Duration::from_secs(0),
        };

        // One locate per canonical name; rows referencing the same video
        // share the result.
        let mut match_cache: HashMap<String, MatchResult> = HashMap::new();

        for row in &loaded.rows {
            let result = match_cache
                .entry(row.canonical_video_name.clone())
                .or_insert_with(|| {
                    locate(
                        &row.canonical_video_name,
                        &candidates,
                        self.config.matching.fuzzy_threshold,
                        self.config.matching.fuzzy_margin,
                    )
                })
                .clone();

            self.process_row(row, &result, &mut report, &mut summary)
                .await;
        }

        summary.report_path = Some(report.save(&self.config.output.base_dir)?);
        summary.total_time = start_time.elapsed();

        info!(
            "🎉 Processed {} row(s) in {:.2}s: {} done, {} skipped, {} not found, {} ambiguous, {} failed, {} invalid",
            summary.total_rows,
            summary.total_time.as_secs_f64(),
            summary.done,
            summary.skipped,
            summary.not_found,
            summary.ambiguous,
            summary.failed,
            summary.invalid_rows
        );
        for problem in &summary.problems {
            warn!("{}", problem);
        }

        Ok(summary)
    }

    async fn process_row(
        &mut self,
        row: &EventRow,
        result: &MatchResult,
        report: &mut ReportWriter,
        summary: &mut RunSummary,
    ) {
        let row_label = format!(
            "{} row {} ({} @ {:.3}s)",
            row.source_sheet, row.source_row_index, row.raw_video_reference, row.event_time_seconds
        );

        if result.status == MatchStatus::Ambiguous {
            let detail = format!("ambiguous candidates: {}", result.candidates.join(", "));
            summary.ambiguous += 1;
            summary.problems.push(format!("{}: {}", row_label, detail));
            report.add_row(row, result.status.as_str(), "ambiguous", None, &detail);
            return;
        }

        let matched = match &result.matched {
            Some(matched) => matched,
            None => {
                summary.not_found += 1;
                summary
                    .problems
                    .push(format!("{}: no matching video file", row_label));
                report.add_row(row, result.status.as_str(), "not_found", None, "");
                return;
            }
        };

        if self
            .ledger
            .is_done(&matched.path, row.event_time_seconds)
        {
            summary.skipped += 1;
            report.add_row(row, result.status.as_str(), "skipped_done", None, "");
            return;
        }

        let duration = match self.durations.duration(&matched.path).await {
            Ok(duration) => duration,
            Err(e) => {
                summary.failed += 1;
                summary.problems.push(format!("{}: {}", row_label, e));
                self.ledger
                    .record(&matched.path, row.event_time_seconds, LedgerOutcome::Failed);
                report.add_row(row, result.status.as_str(), "failed", None, &e.to_string());
                return;
            }
        };

        match self.extractor.extract(matched, row, duration).await {
            Ok(ExtractOutcome::Created(snippet)) => {
                summary.done += 1;
                self.ledger.record(
                    &matched.path,
                    row.event_time_seconds,
                    LedgerOutcome::Completed,
                );
                report.add_row(
                    row,
                    result.status.as_str(),
                    "done",
                    Some(&snippet.output_path),
                    "",
                );
            }
            Ok(ExtractOutcome::AlreadyDone(path)) => {
                summary.skipped += 1;
                self.ledger.record(
                    &matched.path,
                    row.event_time_seconds,
                    LedgerOutcome::Skipped,
                );
                report.add_row(row, result.status.as_str(), "skipped_done", Some(&path), "");
            }
            Err(e) => {
                summary.failed += 1;
                summary.problems.push(format!("{}: {}", row_label, e));
                self.ledger
                    .record(&matched.path, row.event_time_seconds, LedgerOutcome::Failed);
                report.add_row(row, result.status.as_str(), "failed", None, &e.to_string());
            }
        }
    }
}
