use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use tracing::{debug, info, warn};

use crate::error::{SchemaError, TimestampError};
use crate::timestamp::parse_timestamp;

/// Recognized header aliases, resolved case-insensitively. First matching
/// alias per group wins.
const VIDEO_ALIASES: &[&str] = &["video", "video_name", "file", "filename", "file_name"];
const TIME_ALIASES: &[&str] = &[
    "time",
    "timestamp",
    "time_of_interest",
    "start_time",
    "time_awakening_onset",
];
const CLASSIFICATION_ALIASES: &[&str] = &[
    "arousal",
    "arousal_type",
    "type",
    "category",
    "attention_to_left_hindpaw",
    "attention_to_left_paw",
];
const COMMENT_ALIASES: &[&str] = &["comment", "comments", "description", "notes"];

/// Event category derived from the classification column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Pain,
    NonPain,
    Unclassified,
}

impl Classification {
    /// Filename/report segment. Empty for `Unclassified`, which is omitted
    /// from output names entirely.
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Pain => "pain",
            Classification::NonPain => "nonpain",
            Classification::Unclassified => "",
        }
    }

    fn from_cell(value: Option<&str>) -> Self {
        match value.and_then(|v| v.trim().chars().next()) {
            Some('y') | Some('Y') => Classification::Pain,
            Some('n') | Some('N') => Classification::NonPain,
            _ => Classification::Unclassified,
        }
    }
}

/// One requested snippet, as loaded from a sheet row.
#[derive(Debug, Clone)]
pub struct EventRow {
    /// Video reference as written in the sheet (after forward-fill).
    pub raw_video_reference: String,
    /// Stripped, extension-less, lowercased reference used for matching.
    pub canonical_video_name: String,
    pub event_time_seconds: f64,
    /// 2nd `_`-delimited segment of the canonical name, when it has at
    /// least three segments.
    pub subject_id: Option<String>,
    pub classification: Classification,
    pub comment: Option<String>,
    pub source_sheet: String,
    /// Workbook row number (header row is 1).
    pub source_row_index: usize,
}

/// A row excluded during loading, kept for the report.
#[derive(Debug, Clone)]
pub struct RowDiagnostic {
    pub sheet: String,
    pub row_index: usize,
    pub video_reference: String,
    pub reason: String,
}

/// Result of loading the workbook: usable rows plus everything that had to
/// be excluded along the way.
#[derive(Debug, Default)]
pub struct LoadedEvents {
    pub rows: Vec<EventRow>,
    pub diagnostics: Vec<RowDiagnostic>,
    /// Sheets skipped entirely because no usable columns were found.
    pub sheet_errors: Vec<SchemaError>,
}

/// Which sheets of the workbook to process. Indices are 1-based; ranges are
/// inclusive; combinations are comma-separated (`"1,3-5"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelection {
    All,
    Explicit(Vec<(usize, usize)>),
}

impl SheetSelection {
    pub fn parse(selector: &str) -> Result<Self, SchemaError> {
        let trimmed = selector.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(SheetSelection::All);
        }

        let invalid = |reason: &str| SchemaError::SheetSelection {
            selector: selector.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("empty selector"));
        }

        let mut ranges = Vec::new();
        for part in trimmed.split(',') {
            let part = part.trim();
            let (lo, hi) = match part.split_once('-') {
                Some((a, b)) => {
                    let lo: usize = a.trim().parse().map_err(|_| invalid("expected a number"))?;
                    let hi: usize = b.trim().parse().map_err(|_| invalid("expected a number"))?;
                    if lo > hi {
                        return Err(invalid("descending range"));
                    }
                    (lo, hi)
                }
                None => {
                    let n: usize = part.parse().map_err(|_| invalid("expected a number"))?;
                    (n, n)
                }
            };
            if lo == 0 {
                return Err(invalid("sheet indices are 1-based"));
            }
            ranges.push((lo, hi));
        }

        Ok(SheetSelection::Explicit(ranges))
    }

    /// Resolve to 0-based sheet indices, in selector order, de-duplicated.
    /// An index past the end of the workbook is a configuration error.
    pub fn resolve(&self, selector: &str, sheet_count: usize) -> Result<Vec<usize>, SchemaError> {
        match self {
            SheetSelection::All => Ok((0..sheet_count).collect()),
            SheetSelection::Explicit(ranges) => {
                let mut indices = Vec::new();
                for &(lo, hi) in ranges {
                    if hi > sheet_count {
                        return Err(SchemaError::SheetSelection {
                            selector: selector.to_string(),
                            reason: format!(
                                "sheet {} requested but the workbook has only {} sheet(s)",
                                hi, sheet_count
                            ),
                        });
                    }
                    for idx in lo..=hi {
                        if !indices.contains(&(idx - 1)) {
                            indices.push(idx - 1);
                        }
                    }
                }
                Ok(indices)
            }
        }
    }
}

/// Per-sheet binding of canonical fields to column indices, resolved once
/// from the header row.
#[derive(Debug, Clone)]
struct ColumnBinding {
    video: usize,
    time: usize,
    classification: Option<usize>,
    comment: Option<usize>,
}

fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| headers.iter().position(|h| h.eq_ignore_ascii_case(alias)))
}

fn bind_columns(sheet: &str, headers: &[String]) -> Result<ColumnBinding, SchemaError> {
    let video = find_column(headers, VIDEO_ALIASES).ok_or_else(|| {
        SchemaError::MissingVideoColumn {
            sheet: sheet.to_string(),
            expected: VIDEO_ALIASES.join(", "),
        }
    })?;
    let time = find_column(headers, TIME_ALIASES).ok_or_else(|| {
        SchemaError::MissingTimestampColumn {
            sheet: sheet.to_string(),
            expected: TIME_ALIASES.join(", "),
        }
    })?;

    Ok(ColumnBinding {
        video,
        time,
        classification: find_column(headers, CLASSIFICATION_ALIASES),
        comment: find_column(headers, COMMENT_ALIASES),
    })
}

/// Text content of a cell, trimmed; `None` for empty/blank cells.
fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Event time of a cell in seconds. Numeric cells are seconds directly;
/// native date/time cells carry an Excel serial value in days.
fn cell_event_seconds(cell: &Data) -> Result<f64, TimestampError> {
    match cell {
        Data::Float(f) if *f >= 0.0 => Ok(*f),
        Data::Int(i) if *i >= 0 => Ok(*i as f64),
        Data::Float(f) => Err(TimestampError::Negative(f.to_string())),
        Data::Int(i) => Err(TimestampError::Negative(i.to_string())),
        Data::DateTime(dt) => Ok(dt.as_f64() * 86_400.0),
        Data::String(s) => parse_timestamp(s),
        Data::DateTimeIso(s) | Data::DurationIso(s) => parse_timestamp(s),
        Data::Empty => Err(TimestampError::Empty),
        other => Err(TimestampError::Unrecognized(format!("{:?}", other))),
    }
}

/// Strip an extension if present, then lowercase.
fn canonicalize_reference(raw: &str) -> String {
    Path::new(raw.trim())
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| raw.trim().to_string())
        .to_lowercase()
}

/// 2nd `_` segment when the name has at least three segments.
fn derive_subject_id(canonical: &str) -> Option<String> {
    let parts: Vec<&str> = canonical.split('_').collect();
    if parts.len() >= 3 {
        Some(parts[1].to_string())
    } else {
        None
    }
}

fn cell_at<'a>(row: &'a [Data], index: usize) -> Option<&'a Data> {
    row.get(index)
}

/// Parse one sheet's rows (header first) into event rows and diagnostics.
///
/// Empty video cells inherit the nearest preceding non-empty value in the
/// same sheet. Rows before the first non-empty video cell, and rows whose
/// timestamp does not parse, are excluded with a diagnostic. Rows that are
/// entirely blank are skipped silently.
fn parse_sheet<'a, I>(sheet: &str, mut rows: I) -> Result<(Vec<EventRow>, Vec<RowDiagnostic>), SchemaError>
where
    I: Iterator<Item = &'a [Data]>,
{
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|c| cell_text(c).unwrap_or_default())
            .collect(),
        None => Vec::new(),
    };
    let binding = bind_columns(sheet, &headers)?;

    let mut events = Vec::new();
    let mut diagnostics = Vec::new();
    let mut last_video: Option<String> = None;

    for (offset, row) in rows.enumerate() {
        // Workbook row number: header is row 1.
        let row_index = offset + 2;

        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }

        let raw_reference = cell_at(row, binding.video).and_then(cell_text);
        let reference = match raw_reference {
            Some(text) => {
                last_video = Some(text.clone());
                text
            }
            None => match &last_video {
                Some(prev) => prev.clone(),
                None => {
                    diagnostics.push(RowDiagnostic {
                        sheet: sheet.to_string(),
                        row_index,
                        video_reference: String::new(),
                        reason: "no video reference and no preceding row to inherit from"
                            .to_string(),
                    });
                    continue;
                }
            },
        };

        let event_time_seconds = match cell_at(row, binding.time)
            .map(cell_event_seconds)
            .unwrap_or(Err(TimestampError::Empty))
        {
            Ok(seconds) => seconds,
            Err(e) => {
                diagnostics.push(RowDiagnostic {
                    sheet: sheet.to_string(),
                    row_index,
                    video_reference: reference.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let canonical = canonicalize_reference(&reference);
        let classification_text = binding
            .classification
            .and_then(|idx| cell_at(row, idx))
            .and_then(cell_text);

        events.push(EventRow {
            subject_id: derive_subject_id(&canonical),
            classification: Classification::from_cell(classification_text.as_deref()),
            comment: binding.comment.and_then(|idx| cell_at(row, idx)).and_then(cell_text),
            canonical_video_name: canonical,
            raw_video_reference: reference,
            event_time_seconds,
            source_sheet: sheet.to_string(),
            source_row_index: row_index,
        });
    }

    Ok((events, diagnostics))
}

/// Load event rows from the selected sheets of a workbook.
///
/// A sheet with no usable video/timestamp columns is skipped whole and
/// reported in `sheet_errors`; a bad selection or unreadable workbook fails
/// the load.
pub fn load_events(path: &Path, selection: &SheetSelection, selector: &str) -> Result<LoadedEvents, SchemaError> {
    let mut workbook = open_workbook_auto(path).map_err(|source| SchemaError::Workbook {
        path: PathBuf::from(path),
        source,
    })?;

    let sheet_names = workbook.sheet_names();
    info!(
        "📄 Workbook {} has {} sheet(s)",
        path.display(),
        sheet_names.len()
    );

    let indices = selection.resolve(selector, sheet_names.len())?;

    let mut loaded = LoadedEvents::default();
    for idx in indices {
        let name = sheet_names[idx].clone();
        let range = workbook
            .worksheet_range(&name)
            .map_err(|source| SchemaError::Sheet {
                sheet: name.clone(),
                source,
            })?;

        match parse_sheet(&name, range.rows()) {
            Ok((rows, diags)) => {
                debug!(
                    "Sheet {:?}: {} event row(s), {} excluded",
                    name,
                    rows.len(),
                    diags.len()
                );
                loaded.rows.extend(rows);
                loaded.diagnostics.extend(diags);
            }
            Err(e) => {
                warn!("Skipping sheet: {}", e);
                loaded.sheet_errors.push(e);
            }
        }
    }

    info!(
        "📋 Loaded {} event row(s) ({} excluded, {} sheet(s) skipped)",
        loaded.rows.len(),
        loaded.diagnostics.len(),
        loaded.sheet_errors.len()
    );
    Ok(loaded)
}
