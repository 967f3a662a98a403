//! # song-finder
//!
//! Related-song discovery and sequential audio download, as a library.
//!
//! ## Design Philosophy
//!
//! - **Event-driven** - hosts subscribe to [`Event`]s and answer with commands
//! - **Single owner per service** - each service is one tokio task that owns its state
//! - **Pluggable edges** - the search site and the extraction tool sit behind traits
//! - **Library-first** - no CLI or UI, hosts install their own tracing subscriber
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use song_finder::{Config, Event, Link, SongFinder};
//! use song_finder::backend::StaticWebQuery;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = StaticWebQuery::new()
//!         .with_search("aerodynamic", Link::new("Daft Punk", "Aerodynamic", "/song/1"))
//!         .with_page(
//!             Link::new("Daft Punk", "Aerodynamic", "/song/1"),
//!             Some("https://www.youtube.com/watch?v=L93-7vRfxNs"),
//!             vec![],
//!         );
//!
//!     let finder = SongFinder::new(Config::default(), Arc::new(backend))?;
//!     let mut events = finder.subscribe();
//!     let search = finder.start_search("aerodynamic");
//!
//!     while let Ok(event) = events.recv().await {
//!         match event {
//!             Event::SongFound { link } => search.accept(link)?,
//!             Event::DownloadTargetReady { link, url } => println!("{link}: {url:?}"),
//!             Event::SearchExhausted => break,
//!             _ => {}
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Search site backends
pub mod backend;
/// Configuration types
pub mod config;
/// Sequential download queue and extraction tool
pub mod download;
/// Error types
pub mod error;
/// Host-facing facade
pub mod finder;
/// Related-song discovery
pub mod search;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use backend::{HttpWebQuery, PageParser, StaticWebQuery, WebQueryBackend};
pub use config::{Config, DownloadConfig, SearchConfig, ToolsConfig};
pub use download::{AudioExtractor, DownloadHandle, YoutubeDl};
pub use error::{DownloadErrorReason, Error, Result};
pub use finder::SongFinder;
pub use search::SearchHandle;
pub use types::{DownloadState, Event, FetchResult, Link, LinkState};

/// Stop `searches` and `downloads` when the host receives Ctrl+C (or SIGTERM on Unix).
///
/// See [`run_until`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use song_finder::{Config, SongFinder, StaticWebQuery, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let finder = SongFinder::new(Config::default(), Arc::new(StaticWebQuery::new()))?;
///     let downloads = finder.start_downloader();
///     finder.forward_download_targets(&downloads);
///     let search = finder.start_search("daft punk");
///
///     run_with_shutdown(downloads, vec![search]).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloads: DownloadHandle, searches: Vec<SearchHandle>) -> Result<()> {
    run_until(shutdown_signal(), downloads, searches).await
}

/// Wait for `signal`, then stop every search and the download service.
///
/// Searches are stopped first so no new targets reach the queue, then the
/// download service is shut down, killing a running extraction. Every
/// service is stopped even if one fails; the first error is returned.
pub async fn run_until(
    signal: impl Future<Output = ()>,
    downloads: DownloadHandle,
    searches: Vec<SearchHandle>,
) -> Result<()> {
    signal.await;
    tracing::info!(searches = searches.len(), "Stopping song finder services");

    let mut first_error = None;
    for search in searches {
        if let Err(e) = search.shutdown().await {
            tracing::warn!(error = %e, "Search ended with an error");
            first_error.get_or_insert(e);
        }
    }
    if let Err(e) = downloads.shutdown().await {
        tracing::warn!(error = %e, "Download service ended with an error");
        first_error.get_or_insert(e);
    }
    first_error.map_or(Ok(()), Err)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => tokio::select! {
                _ = terminate.recv() => tracing::info!("Terminate signal received"),
                result = tokio::signal::ctrl_c() => ctrl_c_received(result),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Terminate signal unavailable, stopping on Ctrl+C only");
                ctrl_c_received(tokio::signal::ctrl_c().await);
            }
        }
    }
    #[cfg(not(unix))]
    ctrl_c_received(tokio::signal::ctrl_c().await);
}

fn ctrl_c_received(result: std::io::Result<()>) {
    match result {
        Ok(()) => tracing::info!("Ctrl+C received"),
        Err(e) => tracing::error!(error = %e, "Cannot listen for Ctrl+C, stopping now"),
    }
}
