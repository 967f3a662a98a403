//! Configuration types for song-finder

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Search behavior configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of links kept fetching or fetched ahead of the user (default: 5)
    ///
    /// Larger windows hide more network latency behind user decisions at the
    /// cost of more concurrent requests against the search site.
    #[serde(default = "default_prefetch_count")]
    pub prefetch_count: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            prefetch_count: default_prefetch_count(),
        }
    }
}

/// Download behavior configuration (directories, quality, throttling)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory the extracted mp3 files are written to (default: "./songs")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory containing the ffmpeg binaries passed via `--ffmpeg` (default: ".")
    #[serde(default = "default_ffmpeg_dir")]
    pub ffmpeg_dir: PathBuf,

    /// Audio quality passed via `--audio-quality`, 0 (best) to 9 (worst) (default: 3)
    #[serde(default = "default_audio_quality")]
    pub audio_quality: u8,

    /// Download throttle in MB/s passed via `--limit-rate` (None = unthrottled)
    #[serde(default)]
    pub rate_limit_mbps: Option<f64>,

    /// Size in MB a single song is not expected to exceed (default: 15)
    ///
    /// Together with the rate limit this sizes the download timeout.
    #[serde(default = "default_expected_max_size_mb")]
    pub expected_max_size_mb: f64,

    /// Interval between process status checks (default: 1 second)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            ffmpeg_dir: default_ffmpeg_dir(),
            audio_quality: default_audio_quality(),
            rate_limit_mbps: None,
            expected_max_size_mb: default_expected_max_size_mb(),
            poll_interval: default_poll_interval(),
        }
    }
}

impl DownloadConfig {
    /// Rate limit used to size the timeout: the configured limit, or 1 MB/s
    pub fn effective_rate_limit_mbps(&self) -> f64 {
        self.rate_limit_mbps.unwrap_or(1.0)
    }

    /// Time a single download may run before it is killed
    ///
    /// `2 × expected_max_size_mb ÷ effective_rate_limit_mbps` seconds,
    /// saturating at [`Duration::MAX`] when that is not representable.
    pub fn download_timeout(&self) -> Duration {
        self.try_download_timeout().unwrap_or(Duration::MAX)
    }

    /// The download timeout, or `None` if the settings give no representable duration
    pub fn try_download_timeout(&self) -> Option<Duration> {
        let secs = 2.0 * self.expected_max_size_mb / self.effective_rate_limit_mbps();
        Duration::try_from_secs_f64(secs).ok()
    }
}

/// External tool paths
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the youtube-dl compatible executable (auto-detected if None)
    #[serde(default)]
    pub youtube_dl_path: Option<PathBuf>,

    /// Whether to search PATH for the executable if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            youtube_dl_path: None,
            search_path: true,
        }
    }
}

/// Main configuration for [`SongFinder`](crate::SongFinder)
///
/// Sub-config fields are flattened, so the JSON form has no nesting.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Link exploration settings
    #[serde(flatten)]
    pub search: SearchConfig,

    /// Download queue settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// External tool settings
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// Capacity of the event broadcast channel (default: 1000)
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            download: DownloadConfig::default(),
            tools: ToolsConfig::default(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// Missing fields take their defaults. The result is validated.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every setting is usable
    pub fn validate(&self) -> Result<()> {
        if self.search.prefetch_count == 0 {
            return Err(Error::config("prefetch_count", "must be at least 1"));
        }
        if self.download.audio_quality > 9 {
            return Err(Error::config(
                "audio_quality",
                format!("must be between 0 and 9, got {}", self.download.audio_quality),
            ));
        }
        if let Some(rate) = self.download.rate_limit_mbps {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(Error::config(
                    "rate_limit_mbps",
                    format!("must be a positive number of MB/s, got {}", rate),
                ));
            }
        }
        let size = self.download.expected_max_size_mb;
        if !(size.is_finite() && size > 0.0) {
            return Err(Error::config(
                "expected_max_size_mb",
                format!("must be a positive number of MB, got {}", size),
            ));
        }
        if self.download.try_download_timeout().is_none() {
            return Err(Error::config(
                "rate_limit_mbps",
                format!(
                    "a {} MB download at {} MB/s gives a timeout too long to represent",
                    size,
                    self.download.effective_rate_limit_mbps()
                ),
            ));
        }
        if self.download.poll_interval.is_zero() {
            return Err(Error::config("poll_interval", "must be greater than zero"));
        }
        if self.event_capacity == 0 {
            return Err(Error::config("event_capacity", "must be at least 1"));
        }
        Ok(())
    }

    /// Create the output directory
    ///
    /// Called once by the host before starting the download service; the
    /// services themselves never touch the filesystem layout.
    pub async fn prepare_directories(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.download.output_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create output directory '{}': {}",
                        self.download.output_dir.display(),
                        e
                    ),
                ))
            })?;
        tracing::info!(
            output_dir = %self.download.output_dir.display(),
            ffmpeg_dir = %self.download.ffmpeg_dir.display(),
            "Download directories ready"
        );
        Ok(())
    }
}

fn default_prefetch_count() -> usize {
    5
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./songs")
}

fn default_ffmpeg_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_audio_quality() -> u8 {
    3
}

fn default_expected_max_size_mb() -> f64 {
    15.0
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_true() -> bool {
    true
}

fn default_event_capacity() -> usize {
    1000
}

// Duration serialization helper (fractional seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn assert_config_error(config: &Config, expected_key: &str) {
        match config.validate() {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some(expected_key)),
            other => panic!("expected Config error for {expected_key}, got: {:?}", other),
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.search.prefetch_count, 5);
        assert_eq!(config.download.audio_quality, 3);
        assert_eq!(config.download.rate_limit_mbps, None);
        assert_eq!(config.download.expected_max_size_mb, 15.0);
        assert_eq!(config.download.poll_interval, Duration::from_secs(1));
        assert!(config.tools.search_path);
        config.validate().unwrap();
    }

    #[test]
    fn timeout_uses_one_mbps_when_unthrottled() {
        let download = DownloadConfig::default();
        assert_eq!(download.effective_rate_limit_mbps(), 1.0);
        assert_eq!(download.download_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn timeout_scales_inversely_with_rate_limit() {
        let download = DownloadConfig {
            rate_limit_mbps: Some(0.1),
            expected_max_size_mb: 3.0,
            ..Default::default()
        };
        // 2 * 3 / 0.1 = 60 seconds
        let timeout = download.download_timeout();
        assert!(
            (timeout.as_secs_f64() - 60.0).abs() < 1e-6,
            "expected 60s, got {:?}",
            timeout
        );
    }

    #[test]
    fn validate_rejects_zero_prefetch() {
        let mut config = Config::default();
        config.search.prefetch_count = 0;
        assert_config_error(&config, "prefetch_count");
    }

    #[test]
    fn validate_rejects_out_of_range_quality() {
        let mut config = Config::default();
        config.download.audio_quality = 10;
        assert_config_error(&config, "audio_quality");
    }

    #[test]
    fn validate_rejects_non_positive_rate_limit() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let mut config = Config::default();
            config.download.rate_limit_mbps = Some(bad);
            assert_config_error(&config, "rate_limit_mbps");
        }
    }

    #[test]
    fn validate_rejects_unrepresentable_timeout() {
        let mut config = Config::default();
        config.download.rate_limit_mbps = Some(1e-300);
        assert_config_error(&config, "rate_limit_mbps");

        let mut config = Config::default();
        config.download.expected_max_size_mb = f64::MAX;
        assert_config_error(&config, "rate_limit_mbps");
    }

    #[test]
    fn timeout_saturates_instead_of_panicking() {
        let download = DownloadConfig {
            rate_limit_mbps: Some(1e-300),
            ..Default::default()
        };
        assert_eq!(download.try_download_timeout(), None);
        assert_eq!(download.download_timeout(), Duration::MAX);
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let mut config = Config::default();
        config.download.poll_interval = Duration::ZERO;
        assert_config_error(&config, "poll_interval");
    }

    #[test]
    fn json_uses_flat_layout_and_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"rate_limit_mbps": 0.5, "poll_interval": 0.25}"#).unwrap();
        assert_eq!(config.download.rate_limit_mbps, Some(0.5));
        assert_eq!(config.download.poll_interval, Duration::from_millis(250));
        assert_eq!(config.search.prefetch_count, 5);

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["prefetch_count"], 5);
        assert_eq!(json["audio_quality"], 3);
    }

    #[test]
    fn from_json_file_validates_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        std::fs::write(&path, r#"{"audio_quality": 0, "output_dir": "/tmp/songs"}"#).unwrap();
        let config = Config::from_json_file(&path).unwrap();
        assert_eq!(config.download.audio_quality, 0);
        assert_eq!(config.download.output_dir, PathBuf::from("/tmp/songs"));

        std::fs::write(&path, r#"{"prefetch_count": 0}"#).unwrap();
        assert!(matches!(
            Config::from_json_file(&path),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn from_json_file_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::from_json_file(dir.path().join("missing.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn prepare_directories_creates_nested_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.download.output_dir = dir.path().join("music").join("songs");

        config.prepare_directories().await.unwrap();
        assert!(config.download.output_dir.is_dir());
    }
}
