//! Strictly sequential download queue

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

use super::extractor::AudioExtractor;
use super::job::ActiveDownload;
use crate::config::DownloadConfig;
use crate::error::DownloadErrorReason;
use crate::types::{DownloadState, Event};

/// Runs queued downloads one at a time, in FIFO order
///
/// At most one extraction process exists at any moment. The running job is
/// checked on every [`poll_tick`](Self::poll_tick): it is killed once it has
/// run longer than the configured timeout, otherwise its exit status decides
/// the outcome. Each finished job starts the next queued url.
pub struct DownloadQueueSupervisor {
    queue: VecDeque<String>,
    active: Option<ActiveDownload>,
    extractor: Arc<dyn AudioExtractor>,
    event_tx: broadcast::Sender<Event>,
    timeout: Duration,
    poll_interval: Duration,
}

impl DownloadQueueSupervisor {
    /// Create an idle supervisor
    pub fn new(
        extractor: Arc<dyn AudioExtractor>,
        config: &DownloadConfig,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            queue: VecDeque::new(),
            active: None,
            extractor,
            event_tx,
            timeout: config.download_timeout(),
            poll_interval: config.poll_interval,
        }
    }

    /// Append a url to the queue, starting it right away if nothing is running
    pub fn enqueue(&mut self, url: String) {
        tracing::debug!(url = %url, queued = self.queue.len(), "Download queued");
        self.queue.push_back(url.clone());
        self.emit(Event::DownloadQueued { url });
        self.dispatch_attempt();
    }

    /// Start the next queued url if no job is running
    ///
    /// A url whose process cannot be started fails immediately and the next
    /// one is tried.
    pub fn dispatch_attempt(&mut self) {
        while self.active.is_none() {
            let Some(url) = self.queue.pop_front() else {
                return;
            };

            match self.extractor.spawn(&url) {
                Ok(process) => {
                    tracing::info!(url = %url, remaining = self.queue.len(), "Download started");
                    self.active = Some(ActiveDownload::start(
                        url.clone(),
                        process,
                        self.poll_interval,
                    ));
                    self.emit(Event::DownloadStarted { url });
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Failed to start download");
                    self.emit(Event::DownloadError {
                        url,
                        reason: DownloadErrorReason::SpawnFailed {
                            message: e.to_string(),
                        },
                    });
                }
            }
        }
    }

    /// Check the running job as of `now`
    pub fn poll_tick(&mut self, now: Instant) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        let url = active.url().to_string();

        if active.elapsed(now) > self.timeout {
            tracing::warn!(
                url = %url,
                timeout_secs = self.timeout.as_secs_f64(),
                "Download timed out, killing extraction process"
            );
            active.terminate();
            active.finish(DownloadState::TimedOut);
            self.emit(Event::DownloadError {
                url,
                reason: DownloadErrorReason::Timeout,
            });
        } else {
            match active.try_wait() {
                Ok(None) => {
                    self.active = Some(active);
                    return;
                }
                Ok(Some(exit)) if exit.success() => {
                    let job = active.finish(DownloadState::Succeeded);
                    tracing::info!(
                        url = %url,
                        elapsed_secs = now.saturating_duration_since(job.started_at).as_secs_f64(),
                        "Download complete"
                    );
                    self.emit(Event::DownloadComplete { url });
                }
                Ok(Some(exit)) => {
                    active.finish(DownloadState::Failed);
                    tracing::warn!(url = %url, code = ?exit.code, "Extraction process failed");
                    self.emit(Event::DownloadError {
                        url,
                        reason: DownloadErrorReason::NonZeroExit { code: exit.code },
                    });
                }
                Err(e) => {
                    tracing::error!(url = %url, error = %e, "Failed to query extraction process");
                    active.finish(DownloadState::Failed);
                    self.emit(Event::DownloadError {
                        url,
                        reason: DownloadErrorReason::ProcessError {
                            message: e.to_string(),
                        },
                    });
                }
            }
        }

        self.dispatch_attempt();
    }

    /// Wait for the running job's next status check
    ///
    /// Never resolves while the supervisor is idle.
    pub async fn next_tick(&mut self) {
        match self.active.as_mut() {
            Some(active) => active.tick().await,
            None => std::future::pending().await,
        }
    }

    /// Kill the running job and forget the queue
    pub fn shutdown(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::info!(url = %active.url(), "Abandoning running download");
        }
        if !self.queue.is_empty() {
            tracing::info!(abandoned = self.queue.len(), "Dropping queued downloads");
            self.queue.clear();
        }
    }

    /// Whether nothing is running or waiting
    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.queue.is_empty()
    }

    /// Urls waiting behind the running job, in the order they will run
    pub fn queued(&self) -> impl Iterator<Item = &str> {
        self.queue.iter().map(String::as_str)
    }

    /// Url of the running job, if any
    pub fn running(&self) -> Option<&str> {
        self.active.as_ref().map(ActiveDownload::url)
    }

    /// Configured per-job timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}

impl std::fmt::Debug for DownloadQueueSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadQueueSupervisor")
            .field("queue", &self.queue)
            .field("running", &self.running())
            .field("extractor", &self.extractor.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}
