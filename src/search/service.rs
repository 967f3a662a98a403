//! Search control task: the single owner of a [`LinkGraphExplorer`].

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::dispatcher::TaskDispatcher;
use super::explorer::LinkGraphExplorer;
use crate::backend::WebQueryBackend;
use crate::error::{Error, Result};
use crate::types::{Event, Link};

/// User decision about a discovered song
#[derive(Clone, Debug)]
pub enum SearchCommand {
    /// Download this song
    Accept(Link),
    /// Skip this song
    Reject(Link),
}

/// Handle to a running search
///
/// Commands are applied in the order they are sent. The search ends on its
/// own once it is exhausted; [`shutdown`](Self::shutdown) ends it early.
pub struct SearchHandle {
    command_tx: mpsc::UnboundedSender<SearchCommand>,
    cancel: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl SearchHandle {
    /// Accept a song found by this search
    pub fn accept(&self, link: Link) -> Result<()> {
        self.send(SearchCommand::Accept(link))
    }

    /// Reject a song found by this search
    pub fn reject(&self, link: Link) -> Result<()> {
        self.send(SearchCommand::Reject(link))
    }

    /// Send a command to the search task
    pub fn send(&self, command: SearchCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::ShuttingDown)
    }

    /// Whether the search task has stopped
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the search to end on its own
    ///
    /// Returns the error that stopped the search, if any.
    pub async fn join(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| Error::Other(format!("search task failed: {}", e)))?
    }

    /// Stop the search and wait for its task to end
    pub async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        self.join().await
    }
}

/// Spawn the control task for one search
pub(crate) fn spawn_search(
    backend: Arc<dyn WebQueryBackend>,
    prefetch_count: usize,
    event_tx: broadcast::Sender<Event>,
    search_text: String,
) -> SearchHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_search(
        backend,
        prefetch_count,
        event_tx,
        search_text,
        command_rx,
        cancel.clone(),
    ));
    SearchHandle {
        command_tx,
        cancel,
        task,
    }
}

async fn run_search(
    backend: Arc<dyn WebQueryBackend>,
    prefetch_count: usize,
    event_tx: broadcast::Sender<Event>,
    search_text: String,
    mut command_rx: mpsc::UnboundedReceiver<SearchCommand>,
    cancel: CancellationToken,
) -> Result<()> {
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
    let dispatcher = TaskDispatcher::new(Arc::clone(&backend), outcome_tx);
    let mut explorer =
        LinkGraphExplorer::new(prefetch_count, Box::new(dispatcher), event_tx.clone());

    tokio::select! {
        _ = cancel.cancelled() => {
            tracing::info!("Search cancelled before it started");
            event_tx.send(Event::Shutdown).ok();
            return Ok(());
        }
        started = explorer.start_search(backend.as_ref(), &search_text) => started?,
    }

    while !explorer.is_exhausted() {
        let applied = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(pending = explorer.pending_count(), "Search cancelled");
                event_tx.send(Event::Shutdown).ok();
                return Ok(());
            }
            Some(outcome) = outcome_rx.recv() => explorer.handle_fetch_outcome(outcome),
            command = command_rx.recv() => match command {
                Some(SearchCommand::Accept(link)) => explorer.accept(&link),
                Some(SearchCommand::Reject(link)) => explorer.reject(&link),
                None => {
                    tracing::info!("Search handle dropped, ending search");
                    return Ok(());
                }
            },
        };

        if let Err(e) = applied {
            if e.is_fatal() {
                tracing::error!(error = %e, "Search aborted");
                return Err(e);
            }
            tracing::warn!(error = %e, "Ignoring search command");
        }
    }

    tracing::info!("Search finished");
    Ok(())
}
