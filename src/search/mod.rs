//! Related-song discovery with bounded prefetch.
//!
//! - [`explorer`] - the [`LinkGraphExplorer`] state machine
//! - [`graph`] - insertion-ordered link cache
//! - [`dispatcher`] - off-task page fetches reporting back over a channel
//! - [`service`] - the control task that owns an explorer, and its handle

mod dispatcher;
mod explorer;
mod graph;
mod service;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use dispatcher::{FetchDispatch, FetchOutcome, TaskDispatcher};
pub use explorer::{LinkGraphExplorer, PRE_SEND_COUNT};
pub use service::{SearchCommand, SearchHandle};

pub(crate) use service::spawn_search;
