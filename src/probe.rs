use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::ExtractError;

/// Capability for reading a video's duration. Injected so tests can supply
/// fixed durations without ffprobe installed.
#[async_trait]
pub trait DurationProber: Send + Sync {
    async fn probe_duration(&self, path: &Path) -> Result<f64, ExtractError>;
}

/// Production prober shelling out to `ffprobe`.
pub struct FfprobeProber;

#[async_trait]
impl DurationProber for FfprobeProber {
    async fn probe_duration(&self, path: &Path) -> Result<f64, ExtractError> {
        let output = tokio::process::Command::new("ffprobe")
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .output()
            .await?;

        let probe_err = |reason: String| ExtractError::Probe {
            path: path.to_path_buf(),
            reason,
        };

        if !output.status.success() {
            return Err(probe_err(format!(
                "ffprobe exited with {}",
                output.status
            )));
        }

        let data: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| probe_err(format!("unparseable ffprobe output: {}", e)))?;

        data["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|d| *d > 0.0)
            .ok_or_else(|| probe_err("no duration in ffprobe output".to_string()))
    }
}

/// Read-through cache of video durations, one probe per path per run.
pub struct DurationCache {
    prober: Box<dyn DurationProber>,
    durations: HashMap<PathBuf, f64>,
}

impl DurationCache {
    pub fn new(prober: Box<dyn DurationProber>) -> Self {
        Self {
            prober,
            durations: HashMap::new(),
        }
    }

    pub async fn duration(&mut self, path: &Path) -> Result<f64, ExtractError> {
        if let Some(&duration) = self.durations.get(path) {
            return Ok(duration);
        }
        let duration = self.prober.probe_duration(path).await?;
        debug!("📹 {} is {:.1}s long", path.display(), duration);
        self.durations.insert(path.to_path_buf(), duration);
        Ok(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingProber {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DurationProber for CountingProber {
        async fn probe_duration(&self, _path: &Path) -> Result<f64, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(100.0)
        }
    }

    #[tokio::test]
    async fn cache_probes_each_path_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut cache = DurationCache::new(Box::new(CountingProber {
            calls: Arc::clone(&calls),
        }));

        let path = Path::new("/videos/a_1_x.mp4");
        assert_eq!(cache.duration(path).await.unwrap(), 100.0);
        assert_eq!(cache.duration(path).await.unwrap(), 100.0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.duration(Path::new("/videos/b_2_y.mp4")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
