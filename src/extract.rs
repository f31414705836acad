use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::ExtractError;
use crate::events::{Classification, EventRow};
use crate::locate::VideoFileRecord;

/// Narrow capability for cutting one clip. The production implementation
/// shells out to ffmpeg; tests substitute a fake.
///
/// Implementations must guarantee that a failed cut leaves no file at
/// `output`.
#[async_trait]
pub trait MediaCutter: Send + Sync {
    async fn cut(
        &self,
        input: &Path,
        start_seconds: f64,
        duration_seconds: f64,
        output: &Path,
    ) -> Result<(), ExtractError>;
}

/// Stream-copy cutter using the ffmpeg binary.
///
/// Writes to a dot-prefixed sibling temp file and renames into place on
/// success, so an interrupted or failed run never leaves a partial snippet
/// at the final path. A hung ffmpeg is killed after `timeout_seconds` and
/// only that row fails.
///
/// Seeking happens on the input side (`-ss` before `-i`): with stream copy
/// the clip starts at the keyframe at or before the requested start, so on
/// sparse-keyframe inputs it may begin earlier than requested. It never
/// starts late, so the event itself is always included.
pub struct FfmpegCutter {
    pub timeout_seconds: u64,
}

impl FfmpegCutter {
    pub fn new(timeout_seconds: u64) -> Self {
        Self { timeout_seconds }
    }

    fn staging_path(output: &Path) -> PathBuf {
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let ext = output
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        output.with_file_name(format!(".{}.part.{}", stem, ext))
    }
}

#[async_trait]
impl MediaCutter for FfmpegCutter {
    async fn cut(
        &self,
        input: &Path,
        start_seconds: f64,
        duration_seconds: f64,
        output: &Path,
    ) -> Result<(), ExtractError> {
        let staging = Self::staging_path(output);

        let mut command = tokio::process::Command::new("ffmpeg");
        command
            .args(["-hide_banner", "-loglevel", "error"])
            .arg("-ss")
            .arg(format!("{:.3}", start_seconds))
            .arg("-i")
            .arg(input)
            .arg("-t")
            .arg(format!("{:.3}", duration_seconds))
            .args(["-c", "copy", "-avoid_negative_ts", "make_zero", "-y"])
            .arg(&staging)
            .kill_on_drop(true);

        let waited =
            tokio::time::timeout(Duration::from_secs(self.timeout_seconds), command.output())
                .await;

        let output_result = match waited {
            Ok(result) => result?,
            Err(_) => {
                let _ = tokio::fs::remove_file(&staging).await;
                return Err(ExtractError::Timeout(self.timeout_seconds));
            }
        };

        if !output_result.status.success() {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(ExtractError::Cutter {
                status: output_result.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output_result.stderr)
                    .trim()
                    .to_string(),
            });
        }

        if tokio::fs::metadata(&staging).await.is_err() {
            return Err(ExtractError::MissingOutput(staging));
        }

        tokio::fs::rename(&staging, output).await?;
        Ok(())
    }
}

/// The produced clip.
#[derive(Debug, Clone, PartialEq)]
pub struct SnippetOutput {
    pub output_path: PathBuf,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

/// Outcome of one extraction attempt.
#[derive(Debug)]
pub enum ExtractOutcome {
    Created(SnippetOutput),
    /// The output file already exists; treated as already-processed.
    AlreadyDone(PathBuf),
}

/// Computes clip boundaries around each event and drives the cutter.
pub struct SnippetExtractor {
    output_dir: PathBuf,
    lead_seconds: f64,
    trail_seconds: f64,
    min_snippet_seconds: f64,
    cutter: Box<dyn MediaCutter>,
}

impl SnippetExtractor {
    pub fn new(
        output_dir: PathBuf,
        lead_seconds: f64,
        trail_seconds: f64,
        min_snippet_seconds: f64,
        cutter: Box<dyn MediaCutter>,
    ) -> Self {
        Self {
            output_dir,
            lead_seconds,
            trail_seconds,
            min_snippet_seconds,
            cutter,
        }
    }

    /// Output path for a row: `{subject_id|canonical_name}[_{pain|nonpain}]_{HHMMSS}{ext}`.
    pub fn output_path_for(&self, row: &EventRow, matched: &VideoFileRecord) -> PathBuf {
        let base = row
            .subject_id
            .clone()
            .unwrap_or_else(|| row.canonical_video_name.clone());

        let mut name = base;
        if row.classification != Classification::Unclassified {
            name.push('_');
            name.push_str(row.classification.label());
        }
        name.push('_');
        name.push_str(&format_hhmmss(row.event_time_seconds));

        if let Some(ext) = matched.path.extension().and_then(|e| e.to_str()) {
            name.push('.');
            name.push_str(&ext.to_lowercase());
        }

        self.output_dir.join(name)
    }

    /// Cut the snippet for one event row. The interval is
    /// `[event - lead, event + trail]` clamped to `[0, duration]`; a clamped
    /// interval shorter than the minimum is rejected rather than producing a
    /// near-empty file.
    pub async fn extract(
        &self,
        matched: &VideoFileRecord,
        row: &EventRow,
        video_duration_seconds: f64,
    ) -> Result<ExtractOutcome, ExtractError> {
        let start = (row.event_time_seconds - self.lead_seconds).max(0.0);
        let end = (row.event_time_seconds + self.trail_seconds).min(video_duration_seconds);

        if end - start < self.min_snippet_seconds {
            return Err(ExtractError::DegenerateInterval {
                start,
                end,
                min: self.min_snippet_seconds,
            });
        }

        let output_path = self.output_path_for(row, matched);
        if output_path.exists() {
            debug!("Snippet already exists, skipping: {}", output_path.display());
            return Ok(ExtractOutcome::AlreadyDone(output_path));
        }

        self.cutter
            .cut(&matched.path, start, end - start, &output_path)
            .await?;

        if !output_path.exists() {
            return Err(ExtractError::MissingOutput(output_path));
        }

        info!(
            "✂️  {} [{:.1}s - {:.1}s]",
            output_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            start,
            end
        );

        Ok(ExtractOutcome::Created(SnippetOutput {
            output_path,
            start_seconds: start,
            end_seconds: end,
        }))
    }
}

/// Event time as a compact `HHMMSS` filename segment.
pub fn format_hhmmss(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!(
        "{:02}{:02}{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
