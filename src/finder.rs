//! [`SongFinder`]: wires the event bus, the search backend and the extractor together

use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::backend::WebQueryBackend;
use crate::config::Config;
use crate::download::{
    AudioExtractor, DownloadCommand, DownloadHandle, DownloadQueueSupervisor, resolve_extractor,
    spawn_downloader,
};
use crate::error::Result;
use crate::search::{SearchHandle, spawn_search};
use crate::types::Event;

/// Entry point for hosts: starts searches and the download service
///
/// All services report through one broadcast channel; call
/// [`subscribe`](Self::subscribe) before starting them to see every event.
pub struct SongFinder {
    event_tx: broadcast::Sender<Event>,
    config: Arc<Config>,
    backend: Arc<dyn WebQueryBackend>,
    extractor: Arc<dyn AudioExtractor>,
}

impl SongFinder {
    /// Create a finder searching through `backend`
    ///
    /// The configuration is validated and the extraction tool is resolved
    /// from [`ToolsConfig`](crate::config::ToolsConfig).
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use song_finder::{Config, Event, Link, SongFinder};
    /// use song_finder::backend::StaticWebQuery;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let backend = StaticWebQuery::new()
    ///         .with_search("daft punk", Link::new("Daft Punk", "Aerodynamic", "/song/1"))
    ///         .with_page(
    ///             Link::new("Daft Punk", "Aerodynamic", "/song/1"),
    ///             Some("https://www.youtube.com/watch?v=L93-7vRfxNs"),
    ///             vec![],
    ///         );
    ///
    ///     let config = Config::default();
    ///     config.prepare_directories().await?;
    ///     let finder = SongFinder::new(config, Arc::new(backend))?;
    ///
    ///     let mut events = finder.subscribe();
    ///     let downloads = finder.start_downloader();
    ///     finder.forward_download_targets(&downloads);
    ///     let search = finder.start_search("daft punk");
    ///
    ///     while let Ok(event) = events.recv().await {
    ///         match event {
    ///             Event::SongFound { link } => search.accept(link)?,
    ///             Event::DownloadComplete { url } | Event::DownloadError { url, .. } => {
    ///                 println!("finished {url}");
    ///                 break;
    ///             }
    ///             _ => {}
    ///         }
    ///     }
    ///
    ///     search.shutdown().await?;
    ///     downloads.shutdown().await?;
    ///     Ok(())
    /// }
    /// ```
    pub fn new(config: Config, backend: Arc<dyn WebQueryBackend>) -> Result<Self> {
        config.validate()?;
        let extractor = resolve_extractor(&config)?;
        let (event_tx, _rx) = broadcast::channel(config.event_capacity);

        tracing::info!(
            backend = backend.name(),
            extractor = extractor.name(),
            prefetch_count = config.search.prefetch_count,
            "Song finder ready"
        );

        Ok(Self {
            event_tx,
            config: Arc::new(config),
            backend,
            extractor,
        })
    }

    /// Replace the extraction tool
    pub fn with_extractor(mut self, extractor: Arc<dyn AudioExtractor>) -> Self {
        tracing::debug!(extractor = extractor.name(), "Audio extractor replaced");
        self.extractor = extractor;
        self
    }

    /// Subscribe to events from every service started by this finder
    ///
    /// A subscriber that falls behind by more than `event_capacity` events
    /// receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Start a search for `search_text`
    ///
    /// Several searches may run at once; each keeps its own link graph.
    pub fn start_search(&self, search_text: impl Into<String>) -> SearchHandle {
        let search_text = search_text.into();
        tracing::info!(search_text = %search_text, "Starting search");
        spawn_search(
            Arc::clone(&self.backend),
            self.config.search.prefetch_count,
            self.event_tx.clone(),
            search_text,
        )
    }

    /// Start the download service
    pub fn start_downloader(&self) -> DownloadHandle {
        let supervisor = DownloadQueueSupervisor::new(
            Arc::clone(&self.extractor),
            &self.config.download,
            self.event_tx.clone(),
        );
        spawn_downloader(supervisor, self.event_tx.clone())
    }

    /// Queue every accepted song's download target with `downloads`
    ///
    /// Runs until `downloads` is dropped or shut down. The forwarder never
    /// keeps the download service alive by itself, so a dropped handle still
    /// drains the queue and ends the service. Songs whose page had no
    /// download target are logged and skipped.
    pub fn forward_download_targets(&self, downloads: &DownloadHandle) -> JoinHandle<()> {
        let mut events = self.subscribe();
        let command_tx = downloads.weak_command_sender();
        let released = downloads.released();

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = released.cancelled() => {
                        tracing::debug!("Download handle released, no longer forwarding targets");
                        return;
                    }
                    event = events.recv() => event,
                };

                match event {
                    Ok(Event::DownloadTargetReady {
                        link,
                        url: Some(url),
                    }) => {
                        let Some(command_tx) = command_tx.upgrade() else {
                            return;
                        };
                        tracing::debug!(song = %link, url = %url, "Forwarding download target");
                        if command_tx.send(DownloadCommand::Download(url)).is_err() {
                            return;
                        }
                    }
                    Ok(Event::DownloadTargetReady { link, url: None }) => {
                        tracing::info!(song = %link, "Accepted song has no download target");
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Target forwarder lagged, some downloads may be missed");
                    }
                    Err(RecvError::Closed) => return,
                }
            }
        })
    }
}
