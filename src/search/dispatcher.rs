//! Runs page fetches off the search control task.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::backend::WebQueryBackend;
use crate::error::Result;
use crate::types::{FetchResult, Link};

/// Completion message for one dispatched fetch
#[derive(Debug)]
pub struct FetchOutcome {
    /// The link the fetch was dispatched for
    pub link: Link,
    /// What the backend returned
    pub result: Result<FetchResult>,
}

/// Starts a page fetch whose outcome is delivered back later
///
/// Implementations must not call back into the explorer synchronously; the
/// outcome arrives as a [`FetchOutcome`] that the owner of the explorer feeds
/// to [`LinkGraphExplorer::handle_fetch_outcome`](super::LinkGraphExplorer::handle_fetch_outcome).
pub trait FetchDispatch: Send {
    /// Begin fetching `link`
    fn dispatch(&self, link: Link);
}

/// Production [`FetchDispatch`] spawning one tokio task per fetch
pub struct TaskDispatcher {
    backend: Arc<dyn WebQueryBackend>,
    outcome_tx: mpsc::UnboundedSender<FetchOutcome>,
}

impl TaskDispatcher {
    /// Dispatch fetches against `backend`, reporting outcomes on `outcome_tx`
    pub fn new(
        backend: Arc<dyn WebQueryBackend>,
        outcome_tx: mpsc::UnboundedSender<FetchOutcome>,
    ) -> Self {
        Self {
            backend,
            outcome_tx,
        }
    }
}

impl FetchDispatch for TaskDispatcher {
    fn dispatch(&self, link: Link) {
        let backend = Arc::clone(&self.backend);
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = backend.related_and_target(&link).await;
            // The search may have ended while this fetch was in flight
            if outcome_tx.send(FetchOutcome { link, result }).is_err() {
                tracing::debug!("Search ended before fetch completed, dropping result");
            }
        });
    }
}
