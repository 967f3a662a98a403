//! Audio extraction tool: youtube-dl compatible CLI, plus a stub for when none is installed

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::{Child, Command};

use crate::config::{Config, DownloadConfig};
use crate::error::{Error, Result};

/// Executable names searched for in PATH, in order
const TOOL_NAMES: &[&str] = &["youtube-dl", "yt-dlp"];

/// How an extraction process ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code (`None` when terminated by a signal)
    pub code: Option<i32>,
}

impl ProcessExit {
    /// Whether the process exited with status 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// A running extraction process
pub trait ExtractionProcess: Send {
    /// Exit status if the process has ended, without blocking
    fn try_wait(&mut self) -> std::io::Result<Option<ProcessExit>>;

    /// Forcibly terminate the process
    fn kill(&mut self) -> std::io::Result<()>;
}

/// Starts one extraction process per download url
pub trait AudioExtractor: Send + Sync {
    /// Start extracting audio from `url`
    fn spawn(&self, url: &str) -> Result<Box<dyn ExtractionProcess>>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Extractor running a youtube-dl compatible executable
///
/// Invocation: `<tool> --extract-audio --prefer-ffmpeg --audio-format mp3
/// --ffmpeg <dir> --audio-quality <Q> [--limit-rate <R>M] <url>`, run in the
/// output directory.
#[derive(Clone, Debug)]
pub struct YoutubeDl {
    binary_path: PathBuf,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl YoutubeDl {
    /// Create an extractor using the executable at `binary_path`
    pub fn new(binary_path: PathBuf, config: &DownloadConfig) -> Self {
        Self {
            binary_path,
            args: build_args(config),
            working_dir: config.output_dir.clone(),
        }
    }

    /// Attempt to find youtube-dl (or yt-dlp) in PATH
    pub fn from_path(config: &DownloadConfig) -> Option<Self> {
        TOOL_NAMES
            .iter()
            .find_map(|name| which::which(name).ok())
            .map(|path| Self::new(path, config))
    }

    /// Executable this extractor runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Arguments placed before the url
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Flags passed to the tool for every download
pub fn build_args(config: &DownloadConfig) -> Vec<String> {
    let mut args = vec![
        "--extract-audio".to_string(),
        "--prefer-ffmpeg".to_string(),
        "--audio-format".to_string(),
        "mp3".to_string(),
        "--ffmpeg".to_string(),
        config.ffmpeg_dir.display().to_string(),
        "--audio-quality".to_string(),
        config.audio_quality.to_string(),
    ];
    if let Some(rate) = config.rate_limit_mbps {
        args.push("--limit-rate".to_string());
        args.push(format!("{}M", rate));
    }
    args
}

impl AudioExtractor for YoutubeDl {
    fn spawn(&self, url: &str) -> Result<Box<dyn ExtractionProcess>> {
        let child = Command::new(&self.binary_path)
            .args(&self.args)
            .arg(url)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::ExternalTool(format!(
                    "Failed to execute {}: {}",
                    self.binary_path.display(),
                    e
                ))
            })?;
        tracing::debug!(url, pid = ?child.id(), "Extraction process started");
        Ok(Box::new(ChildProcess { child }))
    }

    fn name(&self) -> &'static str {
        "youtube-dl"
    }
}

struct ChildProcess {
    child: Child,
}

impl ExtractionProcess for ChildProcess {
    fn try_wait(&mut self) -> std::io::Result<Option<ProcessExit>> {
        Ok(self
            .child
            .try_wait()?
            .map(|status| ProcessExit { code: status.code() }))
    }

    fn kill(&mut self) -> std::io::Result<()> {
        self.child.start_kill()
    }
}

/// Extractor used when no youtube-dl compatible executable is available
///
/// Every download fails to start with an explanatory error, so the queue
/// keeps draining and the host sees why.
pub struct UnavailableExtractor;

impl AudioExtractor for UnavailableExtractor {
    fn spawn(&self, _url: &str) -> Result<Box<dyn ExtractionProcess>> {
        Err(Error::ExternalTool(
            "audio extraction requires youtube-dl or yt-dlp. \
             Configure youtube_dl_path in config or ensure one is in PATH."
                .into(),
        ))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

/// Pick the extractor described by `config`
///
/// An explicit `youtube_dl_path` must exist. Otherwise PATH is searched when
/// allowed, falling back to [`UnavailableExtractor`].
pub fn resolve_extractor(config: &Config) -> Result<Arc<dyn AudioExtractor>> {
    let extractor: Arc<dyn AudioExtractor> =
        if let Some(ref path) = config.tools.youtube_dl_path {
            if !path.exists() {
                return Err(Error::ToolNotFound(path.clone()));
            }
            Arc::new(YoutubeDl::new(path.clone(), &config.download))
        } else if config.tools.search_path {
            YoutubeDl::from_path(&config.download)
                .map(|e| Arc::new(e) as Arc<dyn AudioExtractor>)
                .unwrap_or_else(|| Arc::new(UnavailableExtractor))
        } else {
            Arc::new(UnavailableExtractor)
        };

    tracing::info!(extractor = extractor.name(), "Audio extractor initialized");
    Ok(extractor)
}
