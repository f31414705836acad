use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

/// A discovered video file, identified for matching by its stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFileRecord {
    pub path: PathBuf,
    /// Filename without extension.
    pub stem: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Exact,
    Substring,
    Fuzzy,
    NotFound,
    Ambiguous,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Exact => "exact",
            MatchStatus::Substring => "substring",
            MatchStatus::Fuzzy => "fuzzy",
            MatchStatus::NotFound => "not_found",
            MatchStatus::Ambiguous => "ambiguous",
        }
    }
}

/// Outcome of locating a video for one canonical name.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub status: MatchStatus,
    pub matched: Option<VideoFileRecord>,
    /// Normalized edit-distance score, only for fuzzy matches.
    pub similarity: Option<f64>,
    /// All tied candidates when the result is ambiguous.
    pub candidates: Vec<String>,
}

impl MatchResult {
    fn not_found() -> Self {
        Self {
            status: MatchStatus::NotFound,
            matched: None,
            similarity: None,
            candidates: Vec::new(),
        }
    }

    fn ambiguous(candidates: Vec<String>) -> Self {
        Self {
            status: MatchStatus::Ambiguous,
            matched: None,
            similarity: None,
            candidates,
        }
    }

    fn found(status: MatchStatus, record: VideoFileRecord, similarity: Option<f64>) -> Self {
        Self {
            status,
            matched: Some(record),
            similarity,
            candidates: Vec::new(),
        }
    }
}

/// Recursively discover video files under `root`, keeping only supported
/// extensions. Never mutates the filesystem.
pub fn discover_videos(root: &Path, extensions: &[String]) -> Vec<VideoFileRecord> {
    let mut records = Vec::new();

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => ext.to_lowercase(),
            None => continue,
        };
        if !extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
            continue;
        }
        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem.to_string(),
            None => continue,
        };
        records.push(VideoFileRecord {
            path: path.to_path_buf(),
            stem,
        });
    }

    info!(
        "🔍 Found {} video file(s) under {}",
        records.len(),
        root.display()
    );
    records
}

/// Find the best matching file for a canonical name.
///
/// Tiers are evaluated in strict priority order and the first one producing
/// any match short-circuits the rest:
/// 1. exact stem equality (case-insensitive); several exact matches are
///    ambiguous, never an arbitrary pick,
/// 2. the name as a substring of the stem, preferring the shortest stem;
///    a residual tie is ambiguous,
/// 3. normalized Levenshtein similarity, accepted only when the best score
///    reaches `threshold` and beats the runner-up by `margin`.
pub fn locate(
    canonical_name: &str,
    candidates: &[VideoFileRecord],
    threshold: f64,
    margin: f64,
) -> MatchResult {
    let name = canonical_name.to_lowercase();

    // Tier 1: exact.
    let exact: Vec<&VideoFileRecord> = candidates
        .iter()
        .filter(|c| c.stem.eq_ignore_ascii_case(&name))
        .collect();
    match exact.len() {
        1 => return MatchResult::found(MatchStatus::Exact, exact[0].clone(), None),
        n if n > 1 => {
            return MatchResult::ambiguous(exact.iter().map(|c| c.stem.clone()).collect())
        }
        _ => {}
    }

    // Tier 2: substring, tightest containment wins.
    let containing: Vec<&VideoFileRecord> = candidates
        .iter()
        .filter(|c| c.stem.to_lowercase().contains(&name))
        .collect();
    if !containing.is_empty() {
        let shortest = containing.iter().map(|c| c.stem.len()).min().unwrap_or(0);
        let tightest: Vec<&&VideoFileRecord> = containing
            .iter()
            .filter(|c| c.stem.len() == shortest)
            .collect();
        if tightest.len() == 1 {
            return MatchResult::found(MatchStatus::Substring, (*tightest[0]).clone(), None);
        }
        return MatchResult::ambiguous(tightest.iter().map(|c| c.stem.clone()).collect());
    }

    // Tier 3: fuzzy.
    let mut scored: Vec<(f64, &VideoFileRecord)> = candidates
        .iter()
        .map(|c| {
            (
                strsim::normalized_levenshtein(&name, &c.stem.to_lowercase()),
                c,
            )
        })
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    if let Some(&(best_score, best)) = scored.first() {
        let runner_up = scored.get(1).map(|&(score, _)| score).unwrap_or(0.0);
        if best_score >= threshold && best_score - runner_up >= margin {
            debug!(
                "Fuzzy match {:?} -> {:?} (score {:.3})",
                canonical_name, best.stem, best_score
            );
            return MatchResult::found(MatchStatus::Fuzzy, best.clone(), Some(best_score));
        }
    }

    MatchResult::not_found()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(stem: &str) -> VideoFileRecord {
        VideoFileRecord {
            path: PathBuf::from(format!("/videos/{}.mp4", stem)),
            stem: stem.to_string(),
        }
    }

    const THRESHOLD: f64 = 0.8;
    const MARGIN: f64 = 0.05;

    #[test]
    fn exact_beats_substring() {
        let candidates = vec![record("2522_2616_bs"), record("2522_2616_bs_extra")];
        let result = locate("2522_2616_bs", &candidates, THRESHOLD, MARGIN);

        assert_eq!(result.status, MatchStatus::Exact);
        assert_eq!(result.matched.unwrap().stem, "2522_2616_bs");
    }

    #[test]
    fn exact_is_case_insensitive() {
        let candidates = vec![record("2522_2616_BS")];
        let result = locate("2522_2616_bs", &candidates, THRESHOLD, MARGIN);
        assert_eq!(result.status, MatchStatus::Exact);
    }

    #[test]
    fn duplicate_exact_matches_are_ambiguous() {
        let candidates = vec![record("2522_2616_bs"), record("2522_2616_BS")];
        let result = locate("2522_2616_bs", &candidates, THRESHOLD, MARGIN);

        assert_eq!(result.status, MatchStatus::Ambiguous);
        assert!(result.matched.is_none());
        assert_eq!(result.candidates.len(), 2);
    }

    #[test]
    fn substring_prefers_shortest_stem() {
        let candidates = vec![
            record("session1_2616_bs_trimmed_copy"),
            record("session1_2616_bs_trimmed"),
        ];
        let result = locate("2616_bs", &candidates, THRESHOLD, MARGIN);

        assert_eq!(result.status, MatchStatus::Substring);
        assert_eq!(result.matched.unwrap().stem, "session1_2616_bs_trimmed");
    }

    #[test]
    fn equal_length_substring_tie_is_ambiguous() {
        let candidates = vec![record("a_2616_bs_cam1"), record("b_2616_bs_cam2")];
        let result = locate("2616_bs", &candidates, THRESHOLD, MARGIN);
        assert_eq!(result.status, MatchStatus::Ambiguous);
    }

    #[test]
    fn fuzzy_accepts_close_names() {
        // One edit in twelve characters, well above the 0.8 threshold.
        let candidates = vec![record("2522_2617_bs"), record("completely_other")];
        let result = locate("2522_2616_bs", &candidates, THRESHOLD, MARGIN);

        assert_eq!(result.status, MatchStatus::Fuzzy);
        assert_eq!(result.matched.unwrap().stem, "2522_2617_bs");
        assert!(result.similarity.unwrap() >= THRESHOLD);
    }

    #[test]
    fn fuzzy_below_threshold_is_not_found() {
        let candidates = vec![record("unrelated_name_here")];
        let result = locate("2522_2616_bs", &candidates, THRESHOLD, MARGIN);
        assert_eq!(result.status, MatchStatus::NotFound);
    }

    #[test]
    fn fuzzy_score_equal_to_threshold_is_accepted() {
        // One edit over length four scores exactly 0.75, a value with an
        // exact float representation, so this pins the inclusive boundary.
        let candidates = vec![record("abcx")];
        let result = locate("abcd", &candidates, 0.75, 0.05);

        assert_eq!(result.status, MatchStatus::Fuzzy);
        assert_eq!(result.similarity, Some(0.75));
    }

    #[test]
    fn fuzzy_lead_equal_to_margin_is_accepted() {
        // Scores 0.75 and 0.5: the best leads the runner-up by exactly the
        // configured margin and is still accepted.
        let candidates = vec![record("abcx"), record("abxx")];
        let result = locate("abcd", &candidates, 0.5, 0.25);

        assert_eq!(result.status, MatchStatus::Fuzzy);
        assert_eq!(result.matched.unwrap().stem, "abcx");
    }

    #[test]
    fn fuzzy_needs_margin_over_runner_up() {
        // Both are one edit away from the query, so neither wins by margin.
        let candidates = vec![record("2522_2617_bs"), record("2522_2618_bs")];
        let result = locate("2522_2616_bs", &candidates, THRESHOLD, MARGIN);
        assert_eq!(result.status, MatchStatus::NotFound);
    }

    #[test]
    fn no_candidates_is_not_found() {
        let result = locate("2522_2616_bs", &[], THRESHOLD, MARGIN);
        assert_eq!(result.status, MatchStatus::NotFound);
    }

    #[test]
    fn discovery_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("a_1_x.mp4"), b"").unwrap();
        std::fs::write(nested.join("b_2_y.MKV"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let exts = vec!["mp4".to_string(), "mkv".to_string()];
        let mut found = discover_videos(dir.path(), &exts);
        found.sort_by(|a, b| a.stem.cmp(&b.stem));

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].stem, "a_1_x");
        assert_eq!(found[1].stem, "b_2_y");
    }
}
