//! Download job bookkeeping and the running-process guard

use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::extractor::{ExtractionProcess, ProcessExit};
use crate::types::DownloadState;

/// One url's passage through the download queue
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadJob {
    /// Url handed to the extractor
    pub url: String,
    /// Current lifecycle state
    pub state: DownloadState,
    /// When the extraction process was started
    pub started_at: Instant,
}

/// The job currently running, together with its process and poll timer
///
/// Dropping an `ActiveDownload` whose process has not been seen to exit
/// kills the process, so no extraction outlives its job.
pub(crate) struct ActiveDownload {
    job: DownloadJob,
    process: Box<dyn ExtractionProcess>,
    ticker: Interval,
    exited: bool,
}

impl ActiveDownload {
    pub(crate) fn start(
        url: String,
        process: Box<dyn ExtractionProcess>,
        poll_interval: Duration,
    ) -> Self {
        let started_at = Instant::now();
        let mut ticker = tokio::time::interval_at(started_at + poll_interval, poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            job: DownloadJob {
                url,
                state: DownloadState::Running,
                started_at,
            },
            process,
            ticker,
            exited: false,
        }
    }

    pub(crate) fn url(&self) -> &str {
        &self.job.url
    }

    pub(crate) fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.job.started_at)
    }

    /// Wait for the next status check
    pub(crate) async fn tick(&mut self) {
        self.ticker.tick().await;
    }

    /// Check the process without blocking
    pub(crate) fn try_wait(&mut self) -> std::io::Result<Option<ProcessExit>> {
        let status = self.process.try_wait()?;
        if status.is_some() {
            self.exited = true;
        }
        Ok(status)
    }

    /// Kill the process now rather than on drop
    pub(crate) fn terminate(&mut self) {
        if self.exited {
            return;
        }
        self.exited = true;
        if let Err(e) = self.process.kill() {
            tracing::warn!(url = %self.job.url, error = %e, "Failed to kill extraction process");
        }
    }

    /// Record the terminal state and release the process
    pub(crate) fn finish(mut self, state: DownloadState) -> DownloadJob {
        self.job.state = state;
        self.job.clone()
    }
}

impl Drop for ActiveDownload {
    fn drop(&mut self) {
        if !self.exited {
            tracing::debug!(url = %self.job.url, "Killing abandoned extraction process");
            self.terminate();
        }
    }
}
