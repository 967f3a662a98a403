//! Link-graph exploration with a bounded prefetch window.

use std::collections::HashSet;
use tokio::sync::broadcast;

use super::dispatcher::{FetchDispatch, FetchOutcome};
use super::graph::LinkGraph;
use crate::backend::WebQueryBackend;
use crate::error::{Error, Result};
use crate::types::{Event, FetchResult, Link, LinkState};

/// Default size of the prefetch window
pub const PRE_SEND_COUNT: usize = 5;

/// Owns the discovery, prefetch and caching state of one search
///
/// Every method runs on the owner's task and never blocks: page fetches go
/// through the [`FetchDispatch`] and come back through
/// [`handle_fetch_outcome`](Self::handle_fetch_outcome). Each discovered link
/// lives in exactly one place: the pending graph while undecided, the used
/// set once accepted-and-delivered or rejected.
pub struct LinkGraphExplorer {
    graph: LinkGraph,
    used: HashSet<Link>,
    prefetch_count: usize,
    dispatcher: Box<dyn FetchDispatch>,
    event_tx: broadcast::Sender<Event>,
    exhausted: bool,
}

impl LinkGraphExplorer {
    /// Create an explorer that keeps up to `prefetch_count` links fetching or fetched
    pub fn new(
        prefetch_count: usize,
        dispatcher: Box<dyn FetchDispatch>,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            graph: LinkGraph::new(),
            used: HashSet::new(),
            prefetch_count,
            dispatcher,
            event_tx,
            exhausted: false,
        }
    }

    /// Ask the backend where `search_text` starts and begin exploring from there
    ///
    /// A search with no match is exhausted immediately. A backend failure is
    /// reported as [`Event::SearchFailed`], exhausts the search and is returned.
    pub async fn start_search(
        &mut self,
        backend: &dyn WebQueryBackend,
        search_text: &str,
    ) -> Result<()> {
        tracing::info!(search_text, backend = backend.name(), "Starting song search");
        match backend.initial_link(search_text).await {
            Ok(initial) => self.seed(initial),
            Err(e) => {
                tracing::warn!(search_text, error = %e, "Initial search failed");
                self.emit(Event::SearchFailed {
                    search_text: search_text.to_string(),
                    error: e.to_string(),
                });
                self.emit_exhausted();
                Err(e)
            }
        }
    }

    /// Begin exploring from the backend's answer to the initial search
    pub fn seed(&mut self, initial: Option<Link>) -> Result<()> {
        let Some(link) = initial else {
            tracing::info!("Search returned no match");
            self.emit_exhausted();
            return Ok(());
        };
        self.graph.insert(link.clone());
        self.emit(Event::SongFound { link: link.clone() });
        self.request_details(&link, false)
    }

    /// The user wants this song: deliver its download target as soon as it is known
    pub fn accept(&mut self, link: &Link) -> Result<()> {
        self.request_details(link, true)
    }

    /// The user does not want this song
    ///
    /// The link is retired without looking at anything cached for it, so a
    /// rejected song never contributes related links.
    pub fn reject(&mut self, link: &Link) -> Result<()> {
        if self.graph.remove(link).is_none() {
            return Err(Error::NotFound(link.url.clone()));
        }
        tracing::debug!(url = %link.url, "Song rejected");
        self.retire(link);
        Ok(())
    }

    /// Make sure `link` is being fetched, optionally asking for its download target
    ///
    /// A link already fetched and wanted is finalized on the spot. A link in
    /// flight just remembers the request. A new fetch tops the prefetch window
    /// back up with the earliest-discovered unfetched links.
    pub fn request_details(&mut self, link: &Link, wants_download: bool) -> Result<()> {
        let state = self
            .graph
            .get(link)
            .map(|r| r.state())
            .ok_or_else(|| Error::NotFound(link.url.clone()))?;

        match state {
            LinkState::Complete => {
                if wants_download {
                    self.finalize(link)?;
                }
                Ok(())
            }
            LinkState::Downloading => {
                if let Some(record) = self.graph.get_mut(link) {
                    record.request_download(wants_download);
                }
                Ok(())
            }
            LinkState::Uninitialized => {
                self.start_fetch(link, wants_download)?;
                self.top_off_prefetch()
            }
        }
    }

    /// Apply a completed or failed fetch
    ///
    /// # Errors
    ///
    /// [`Error::ProtocolViolation`] if the result answers a different link
    /// than the one dispatched. The explorer's bookkeeping can no longer be
    /// trusted after that; callers should stop the search.
    pub fn handle_fetch_outcome(&mut self, outcome: FetchOutcome) -> Result<()> {
        match outcome.result {
            Ok(result) => self.on_fetch_complete(&outcome.link, result),
            Err(e) => {
                self.on_fetch_failed(&outcome.link, &e);
                Ok(())
            }
        }
    }

    /// Whether `SearchExhausted` has been emitted
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Number of undecided links
    pub fn pending_count(&self) -> usize {
        self.graph.len()
    }

    /// Undecided links in discovery order
    pub fn pending_links(&self) -> impl Iterator<Item = &Link> {
        self.graph.links()
    }

    /// Fetch state of an undecided link (`None` once decided or if never seen)
    pub fn link_state(&self, link: &Link) -> Option<LinkState> {
        self.graph.get(link).map(|r| r.state())
    }

    /// Whether `link` has been accepted-and-delivered or rejected
    pub fn is_used(&self, link: &Link) -> bool {
        self.used.contains(link)
    }

    fn start_fetch(&mut self, link: &Link, wants_download: bool) -> Result<()> {
        let record = self
            .graph
            .get_mut(link)
            .ok_or_else(|| Error::NotFound(link.url.clone()))?;
        record.set_downloading(&link.url)?;
        record.request_download(wants_download);
        tracing::debug!(url = %link.url, wants_download, "Dispatching page fetch");
        self.dispatcher.dispatch(link.clone());
        Ok(())
    }

    fn top_off_prefetch(&mut self) -> Result<()> {
        while self.graph.in_flight_count() < self.prefetch_count {
            let Some(next) = self.graph.first_uninitialized().cloned() else {
                break;
            };
            self.start_fetch(&next, false)?;
        }
        Ok(())
    }

    fn on_fetch_complete(&mut self, link: &Link, result: FetchResult) -> Result<()> {
        if result.requesting_link != *link {
            tracing::error!(
                expected = %link.url,
                received = %result.requesting_link.url,
                "Fetch result does not match its request"
            );
            return Err(Error::ProtocolViolation {
                expected: link.url.clone(),
                received: result.requesting_link.url,
            });
        }

        let Some(record) = self.graph.get_mut(link) else {
            // Rejected while in flight
            tracing::debug!(url = %link.url, "Dropping fetch result for retired link");
            return Ok(());
        };
        record.set_received_data(&link.url, result.download_target, result.related_links)?;
        let related = record.related_links().to_vec();
        let download_requested = record.download_requested();

        self.merge_related(&related);
        if download_requested {
            self.finalize(link)?;
        }
        Ok(())
    }

    fn on_fetch_failed(&mut self, link: &Link, error: &Error) {
        // No retry: the record stays Downloading.
        tracing::warn!(url = %link.url, error = %error, "Page fetch failed");
        self.emit(Event::FetchFailed {
            link: link.clone(),
            error: error.to_string(),
        });
    }

    /// Deliver the download target of a fetched link and retire it
    fn finalize(&mut self, link: &Link) -> Result<()> {
        let (related, url) = {
            let record = self
                .graph
                .get(link)
                .ok_or_else(|| Error::NotFound(link.url.clone()))?;
            (
                record.related_links().to_vec(),
                record.download_target().map(str::to_string),
            )
        };
        // Idempotent when completion already merged these
        self.merge_related(&related);

        tracing::info!(url = %link.url, target = ?url, "Download target ready");
        self.emit(Event::DownloadTargetReady {
            link: link.clone(),
            url,
        });
        self.graph.remove(link);
        self.retire(link);
        Ok(())
    }

    fn merge_related(&mut self, related: &[Link]) {
        for candidate in related {
            if self.used.contains(candidate) || self.graph.contains(candidate) {
                continue;
            }
            self.graph.insert(candidate.clone());
            self.emit(Event::SongFound {
                link: candidate.clone(),
            });
        }
    }

    /// Record a link as used; the caller has already removed it from the graph
    fn retire(&mut self, link: &Link) {
        self.used.insert(link.clone());
        if self.graph.is_empty() {
            self.emit_exhausted();
        }
    }

    fn emit_exhausted(&mut self) {
        if self.exhausted {
            return;
        }
        self.exhausted = true;
        tracing::info!(used = self.used.len(), "Search exhausted");
        self.emit(Event::SearchExhausted);
    }

    fn emit(&self, event: Event) {
        // No subscribers is not an error
        self.event_tx.send(event).ok();
    }
}
