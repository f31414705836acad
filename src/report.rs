use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::events::{EventRow, RowDiagnostic};
use crate::extract::format_hhmmss;

/// One line of the processing report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRecord {
    pub video_reference: String,
    pub source_sheet: String,
    pub source_row: usize,
    pub match_status: String,
    pub timestamp_hhmmss: String,
    pub timestamp_seconds: String,
    pub classification: String,
    pub subject_id: String,
    pub comment: String,
    pub outcome: String,
    pub snippet_path: String,
    pub detail: String,
    pub processing_date: String,
}

/// Accumulates per-row outcomes and writes the final CSV report.
#[derive(Debug, Default)]
pub struct ReportWriter {
    records: Vec<ReportRecord>,
}

impl ReportWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(
        &mut self,
        row: &EventRow,
        match_status: &str,
        outcome: &str,
        snippet_path: Option<&Path>,
        detail: &str,
    ) {
        self.records.push(ReportRecord {
            video_reference: row.raw_video_reference.clone(),
            source_sheet: row.source_sheet.clone(),
            source_row: row.source_row_index,
            match_status: match_status.to_string(),
            timestamp_hhmmss: format_hhmmss(row.event_time_seconds),
            timestamp_seconds: format!("{:.3}", row.event_time_seconds),
            classification: row.classification.label().to_string(),
            subject_id: row.subject_id.clone().unwrap_or_default(),
            comment: row.comment.clone().unwrap_or_default(),
            outcome: outcome.to_string(),
            snippet_path: snippet_path
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            detail: detail.to_string(),
            processing_date: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        });
    }

    /// Rows excluded during loading still appear in the report.
    pub fn add_invalid_row(&mut self, diagnostic: &RowDiagnostic) {
        self.records.push(ReportRecord {
            video_reference: diagnostic.video_reference.clone(),
            source_sheet: diagnostic.sheet.clone(),
            source_row: diagnostic.row_index,
            match_status: String::new(),
            timestamp_hhmmss: String::new(),
            timestamp_seconds: String::new(),
            classification: String::new(),
            subject_id: String::new(),
            comment: String::new(),
            outcome: "invalid_row".to_string(),
            snippet_path: String::new(),
            detail: diagnostic.reason.clone(),
            processing_date: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ReportRecord] {
        &self.records
    }

    /// Write `snippet_processing_report_{timestamp}.csv` into `output_dir`.
    pub fn save(&self, output_dir: &Path) -> Result<PathBuf> {
        let filename = format!(
            "snippet_processing_report_{}.csv",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        let path = output_dir.join(filename);

        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("failed to create report at {}", path.display()))?;
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        info!(
            "💾 Report with {} record(s) saved to {}",
            self.records.len(),
            path.display()
        );
        Ok(path)
    }
}
