use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the snippet extraction pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Snippet boundary and cutter settings
    pub extraction: ExtractionConfig,

    /// Video locating settings
    pub matching: MatchingConfig,

    /// Output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Seconds of clip included before each event timestamp
    pub lead_seconds: f64,

    /// Seconds of clip included after each event timestamp
    pub trail_seconds: f64,

    /// Minimum clip length after clamping; shorter intervals are rejected
    pub min_snippet_seconds: f64,

    /// Per-invocation timeout for the external cutter process (seconds)
    pub cutter_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Minimum normalized similarity for a fuzzy match to be accepted
    pub fuzzy_threshold: f64,

    /// How much the best fuzzy score must beat the runner-up by
    pub fuzzy_margin: f64,

    /// Video file extensions considered during discovery
    pub supported_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory snippets and the report are written to
    pub base_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extraction: ExtractionConfig {
                lead_seconds: 5.0,
                trail_seconds: 10.0,
                min_snippet_seconds: 1.0,
                cutter_timeout_seconds: 60,
            },
            matching: MatchingConfig {
                fuzzy_threshold: 0.8,
                fuzzy_margin: 0.05,
                supported_extensions: vec![
                    "mp4".to_string(),
                    "avi".to_string(),
                    "mov".to_string(),
                    "mkv".to_string(),
                    "wmv".to_string(),
                    "flv".to_string(),
                    "webm".to_string(),
                    "m4v".to_string(),
                ],
            },
            output: OutputConfig {
                base_dir: PathBuf::from("./snippets"),
            },
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_paths = [
            "snippet-extractor.toml",
            "config/snippet-extractor.toml",
            "~/.config/snippet-extractor/config.toml",
            "/etc/snippet-extractor/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        config.apply_env();
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Err(anyhow!("No configuration file found"))
    }

    /// Load configuration from an explicit file, bypassing the search paths.
    /// Unlike `load`, a missing or malformed file is an error: the user asked
    /// for this exact file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
        let mut config: Config = toml::from_str(&config_str)
            .map_err(|e| anyhow!("failed to parse config file {}: {}", path.display(), e))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        config.apply_env();
        Ok(config)
    }

    /// Default configuration with environment-variable overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(lead) = std::env::var("SNIPPET_LEAD_SECONDS") {
            if let Ok(v) = lead.parse() {
                self.extraction.lead_seconds = v;
            }
        }
        if let Ok(trail) = std::env::var("SNIPPET_TRAIL_SECONDS") {
            if let Ok(v) = trail.parse() {
                self.extraction.trail_seconds = v;
            }
        }
        if let Ok(timeout) = std::env::var("SNIPPET_CUTTER_TIMEOUT") {
            if let Ok(v) = timeout.parse() {
                self.extraction.cutter_timeout_seconds = v;
            }
        }
        if let Ok(threshold) = std::env::var("SNIPPET_FUZZY_THRESHOLD") {
            if let Ok(v) = threshold.parse() {
                self.matching.fuzzy_threshold = v;
            }
        }
        if let Ok(margin) = std::env::var("SNIPPET_FUZZY_MARGIN") {
            if let Ok(v) = margin.parse() {
                self.matching.fuzzy_margin = v;
            }
        }
        if let Ok(dir) = std::env::var("SNIPPET_OUTPUT_DIR") {
            self.output.base_dir = PathBuf::from(dir);
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.extraction.lead_seconds < 0.0 || self.extraction.trail_seconds < 0.0 {
            return Err(anyhow!("lead/trail seconds must not be negative"));
        }
        if self.extraction.min_snippet_seconds <= 0.0 {
            return Err(anyhow!("min_snippet_seconds must be greater than 0"));
        }
        if self.extraction.cutter_timeout_seconds == 0 {
            return Err(anyhow!("cutter_timeout_seconds must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.matching.fuzzy_threshold) {
            return Err(anyhow!("fuzzy_threshold must be within [0, 1]"));
        }
        if self.matching.fuzzy_margin < 0.0 {
            return Err(anyhow!("fuzzy_margin must not be negative"));
        }
        if self.matching.supported_extensions.is_empty() {
            return Err(anyhow!("supported_extensions must not be empty"));
        }
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Snippet Extractor Configuration:\n\
            - Lead/Trail: {:.1}s / {:.1}s\n\
            - Fuzzy Threshold/Margin: {:.2} / {:.2}\n\
            - Cutter Timeout: {}s\n\
            - Output Directory: {}\n\
            - Supported Extensions: {}",
            self.extraction.lead_seconds,
            self.extraction.trail_seconds,
            self.matching.fuzzy_threshold,
            self.matching.fuzzy_margin,
            self.extraction.cutter_timeout_seconds,
            self.output.base_dir.display(),
            self.matching.supported_extensions.join(", ")
        )
    }
}
