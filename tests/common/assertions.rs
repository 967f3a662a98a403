//! Event-waiting helpers for integration tests

use std::time::Duration;
use song_finder::{DownloadErrorReason, Event, SearchHandle};
use tokio::sync::broadcast;

/// Result of waiting for a download to finish
#[derive(Debug, PartialEq)]
pub enum WaitResult {
    /// Tool exited with status 0
    Completed,
    /// Download ended without success
    Failed(DownloadErrorReason),
    /// Timeout waiting for completion
    Timeout,
    /// Channel closed unexpectedly
    ChannelClosed,
}

/// Wait for the download of `url` to reach a terminal state
pub async fn wait_for_download(
    events: &mut broadcast::Receiver<Event>,
    url: &str,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::DownloadComplete { url: done }) if done == url => {
                    return WaitResult::Completed;
                }
                Ok(Event::DownloadError { url: failed, reason }) if failed == url => {
                    return WaitResult::Failed(reason);
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return WaitResult::ChannelClosed,
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}

/// Events seen while driving a search to exhaustion
#[derive(Debug, Default)]
pub struct SearchRun {
    /// Urls of `SongFound` links, in emission order
    pub found: Vec<String>,
    /// `(link url, download target)` of each `DownloadTargetReady`
    pub ready: Vec<(String, Option<String>)>,
    /// Number of `SearchExhausted` events
    pub exhausted: usize,
    /// Every event, in emission order
    pub events: Vec<Event>,
}

/// Answer every `SongFound` with `decide` until the search is exhausted
pub async fn drive_search(
    events: &mut broadcast::Receiver<Event>,
    search: &SearchHandle,
    mut decide: impl FnMut(&song_finder::Link) -> bool,
) -> SearchRun {
    let mut run = SearchRun::default();
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let event = events.recv().await.expect("event channel closed");
            run.events.push(event.clone());
            match event {
                Event::SongFound { link } => {
                    run.found.push(link.url.clone());
                    let sent = if decide(&link) {
                        search.accept(link)
                    } else {
                        search.reject(link)
                    };
                    sent.expect("search stopped early");
                }
                Event::DownloadTargetReady { link, url } => run.ready.push((link.url, url)),
                Event::SearchExhausted => {
                    run.exhausted += 1;
                    return;
                }
                _ => {}
            }
        }
    })
    .await
    .expect("search did not finish");
    run
}
