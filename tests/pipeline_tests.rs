use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use snippet_extractor::config::Config;
use snippet_extractor::error::ExtractError;
use snippet_extractor::events::{Classification, EventRow, LoadedEvents, RowDiagnostic};
use snippet_extractor::extract::MediaCutter;
use snippet_extractor::pipeline::Pipeline;
use snippet_extractor::probe::DurationProber;

/// Cutter that writes a marker file instead of invoking ffmpeg.
struct FakeCutter {
    cuts: Arc<AtomicUsize>,
}

#[async_trait]
impl MediaCutter for FakeCutter {
    async fn cut(
        &self,
        _input: &Path,
        _start: f64,
        _duration: f64,
        output: &Path,
    ) -> Result<(), ExtractError> {
        self.cuts.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(output, b"clip").await?;
        Ok(())
    }
}

/// Cutter whose every invocation fails, leaving no output behind.
struct BrokenCutter;

#[async_trait]
impl MediaCutter for BrokenCutter {
    async fn cut(
        &self,
        _input: &Path,
        _start: f64,
        _duration: f64,
        _output: &Path,
    ) -> Result<(), ExtractError> {
        Err(ExtractError::Cutter {
            status: 1,
            stderr: "invalid data found when processing input".to_string(),
        })
    }
}

struct FixedProber {
    duration: f64,
}

#[async_trait]
impl DurationProber for FixedProber {
    async fn probe_duration(&self, _path: &Path) -> Result<f64, ExtractError> {
        Ok(self.duration)
    }
}

fn event(video: &str, time: f64, classification: Classification) -> EventRow {
    let canonical = video.to_lowercase();
    let parts: Vec<&str> = canonical.split('_').collect();
    EventRow {
        raw_video_reference: video.to_string(),
        subject_id: if parts.len() >= 3 {
            Some(parts[1].to_string())
        } else {
            None
        },
        canonical_video_name: canonical,
        event_time_seconds: time,
        classification,
        comment: None,
        source_sheet: "sheet1".to_string(),
        source_row_index: 2,
    }
}

fn loaded(rows: Vec<EventRow>) -> LoadedEvents {
    LoadedEvents {
        rows,
        diagnostics: Vec::new(),
        sheet_errors: Vec::new(),
    }
}

struct Setup {
    _tmp: TempDir,
    video_dir: PathBuf,
    output_dir: PathBuf,
    cuts: Arc<AtomicUsize>,
}

impl Setup {
    fn new(video_stems: &[&str]) -> Self {
        let tmp = TempDir::new().unwrap();
        let video_dir = tmp.path().join("videos");
        let output_dir = tmp.path().join("snippets");
        std::fs::create_dir_all(&video_dir).unwrap();
        for stem in video_stems {
            std::fs::write(video_dir.join(format!("{}.mp4", stem)), b"video").unwrap();
        }
        Self {
            _tmp: tmp,
            video_dir,
            output_dir,
            cuts: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn pipeline(&self) -> Pipeline {
        let mut config = Config::default();
        config.output.base_dir = self.output_dir.clone();
        Pipeline::new(
            config,
            Box::new(FakeCutter {
                cuts: Arc::clone(&self.cuts),
            }),
            Box::new(FixedProber { duration: 300.0 }),
        )
    }

    fn snippet_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.output_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.ends_with(".mp4"))
            .collect();
        names.sort();
        names
    }

    fn report_files(&self) -> Vec<String> {
        std::fs::read_dir(&self.output_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.starts_with("snippet_processing_report_") && n.ends_with(".csv"))
            .collect()
    }
}

#[tokio::test]
async fn full_run_creates_snippets_and_report() {
    let setup = Setup::new(&["2522_2616_bs"]);
    let mut pipeline = setup.pipeline();

    let rows = vec![
        event("2522_2616_bs", 125.0, Classification::Pain),
        event("2522_2616_bs", 200.0, Classification::NonPain),
        event("missing_video_name", 10.0, Classification::Unclassified),
    ];

    let summary = pipeline
        .process_events(loaded(rows), &setup.video_dir)
        .await
        .unwrap();

    assert_eq!(summary.done, 2);
    assert_eq!(summary.not_found, 1);
    assert_eq!(summary.failed, 0);
    assert!(!summary.has_failures());

    assert_eq!(
        setup.snippet_files(),
        vec![
            "2616_nonpain_000320.mp4".to_string(),
            "2616_pain_000205.mp4".to_string(),
        ]
    );
    assert_eq!(setup.report_files().len(), 1);

    let report = std::fs::read_to_string(
        setup.output_dir.join(&setup.report_files()[0]),
    )
    .unwrap();
    assert!(report.contains("2616_pain_000205.mp4"));
    assert!(report.contains("not_found"));
}

#[tokio::test]
async fn second_run_is_idempotent() {
    let setup = Setup::new(&["2522_2616_bs"]);
    let rows = || {
        vec![
            event("2522_2616_bs", 125.0, Classification::Pain),
            event("2522_2616_bs", 200.0, Classification::NonPain),
        ]
    };

    let mut first = setup.pipeline();
    let summary = first
        .process_events(loaded(rows()), &setup.video_dir)
        .await
        .unwrap();
    assert_eq!(summary.done, 2);
    assert_eq!(setup.cuts.load(Ordering::SeqCst), 2);

    // Fresh pipeline, same output directory: everything is skipped, nothing
    // is re-cut, and no extra snippet files appear.
    let mut second = setup.pipeline();
    let summary = second
        .process_events(loaded(rows()), &setup.video_dir)
        .await
        .unwrap();
    assert_eq!(summary.done, 0);
    assert_eq!(summary.skipped, 2);
    assert_eq!(setup.cuts.load(Ordering::SeqCst), 2);
    assert_eq!(setup.snippet_files().len(), 2);
}

#[tokio::test]
async fn duplicate_rows_within_a_run_are_skipped_via_ledger() {
    let setup = Setup::new(&["2522_2616_bs"]);
    let mut pipeline = setup.pipeline();

    // Same video and same event time twice, e.g. listed on two sheets.
    let rows = vec![
        event("2522_2616_bs", 125.0, Classification::Pain),
        event("2522_2616_bs", 125.0, Classification::Pain),
    ];

    let summary = pipeline
        .process_events(loaded(rows), &setup.video_dir)
        .await
        .unwrap();

    assert_eq!(summary.done, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(setup.cuts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_extraction_is_row_local() {
    let setup = Setup::new(&["2522_2616_bs", "2522_2617_xy"]);
    let mut config = Config::default();
    config.output.base_dir = setup.output_dir.clone();
    let mut pipeline = Pipeline::new(
        config,
        Box::new(BrokenCutter),
        Box::new(FixedProber { duration: 300.0 }),
    );

    let rows = vec![
        event("2522_2616_bs", 125.0, Classification::Pain),
        event("2522_2617_xy", 50.0, Classification::NonPain),
    ];

    let summary = pipeline
        .process_events(loaded(rows), &setup.video_dir)
        .await
        .unwrap();

    // Both rows were attempted and both failed; the run still completed and
    // produced a report, with no partial snippet files.
    assert_eq!(summary.failed, 2);
    assert!(summary.has_failures());
    assert_eq!(summary.problems.len(), 2);
    assert!(setup.snippet_files().is_empty());
    assert_eq!(setup.report_files().len(), 1);

    // The report rows carry the failed outcome and the cutter's reason.
    let report = std::fs::read_to_string(
        setup.output_dir.join(&setup.report_files()[0]),
    )
    .unwrap();
    assert_eq!(report.matches(",failed,").count(), 2);
    assert!(report.contains("invalid data found when processing input"));
}

#[tokio::test]
async fn ambiguous_match_is_reported_not_guessed() {
    let setup = Setup::new(&["2522_2616_bs", "2522_2616_BS"]);
    let mut pipeline = setup.pipeline();

    let rows = vec![event("2522_2616_bs", 125.0, Classification::Pain)];
    let summary = pipeline
        .process_events(loaded(rows), &setup.video_dir)
        .await
        .unwrap();

    assert_eq!(summary.ambiguous, 1);
    assert_eq!(summary.done, 0);
    assert!(summary.problems[0].contains("ambiguous"));
    assert!(setup.snippet_files().is_empty());
}

#[tokio::test]
async fn degenerate_interval_fails_the_row_only() {
    let setup = Setup::new(&["2522_2616_bs"]);
    let mut config = Config::default();
    config.output.base_dir = setup.output_dir.clone();
    let mut pipeline = Pipeline::new(
        config,
        Box::new(FakeCutter {
            cuts: Arc::clone(&setup.cuts),
        }),
        // Video far shorter than the minimum snippet length.
        Box::new(FixedProber { duration: 0.5 }),
    );

    let rows = vec![event("2522_2616_bs", 0.2, Classification::Pain)];
    let summary = pipeline
        .process_events(loaded(rows), &setup.video_dir)
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert!(summary.problems[0].contains("degenerate interval"));
    assert_eq!(setup.cuts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn loader_diagnostics_appear_in_report() {
    let setup = Setup::new(&["2522_2616_bs"]);
    let mut pipeline = setup.pipeline();

    let events = LoadedEvents {
        rows: vec![event("2522_2616_bs", 125.0, Classification::Pain)],
        diagnostics: vec![RowDiagnostic {
            sheet: "sheet1".to_string(),
            row_index: 2,
            video_reference: String::new(),
            reason: "no video reference and no preceding row to inherit from".to_string(),
        }],
        sheet_errors: Vec::new(),
    };

    let summary = pipeline
        .process_events(events, &setup.video_dir)
        .await
        .unwrap();

    assert_eq!(summary.invalid_rows, 1);
    assert_eq!(summary.done, 1);

    let report = std::fs::read_to_string(
        setup.output_dir.join(&setup.report_files()[0]),
    )
    .unwrap();
    assert!(report.contains("invalid_row"));
    assert!(report.contains("no preceding row"));
}
