//! Shared fixtures for search tests.


use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use super::{FetchDispatch, FetchOutcome, LinkGraphExplorer};
use crate::backend::StaticWebQuery;
use crate::types::{Event, FetchResult, Link};

/// The closed "find_me" graph: (n, download target, related links)
const FIND_ME: &[(u32, Option<&str>, &[u32])] = &[
    (1, Some("youtube_1"), &[2, 3, 4]),
    (2, Some("youtube_2"), &[4, 5, 6]),
    (3, None, &[2, 3]),
    (4, Some("youtube_4"), &[7]),
    (5, Some("youtube_5"), &[]),
    (6, Some("youtube_6"), &[]),
    (7, Some("youtube_7"), &[]),
];

pub(super) fn link(n: u32) -> Link {
    Link::new(format!("artist_{n}"), format!("song_{n}"), format!("link_{n}"))
}

/// Page contents for `link_n` in the find_me graph
pub(super) fn find_me_page(n: u32) -> FetchResult {
    let (_, target, related) = FIND_ME
        .iter()
        .find(|(m, _, _)| *m == n)
        .copied()
        .unwrap();
    FetchResult {
        requesting_link: link(n),
        download_target: target.map(str::to_string),
        related_links: related.iter().map(|r| link(*r)).collect(),
    }
}

/// In-memory backend serving the find_me graph
pub(super) fn find_me_backend() -> StaticWebQuery {
    FIND_ME.iter().fold(
        StaticWebQuery::new().with_search("find_me", link(1)),
        |backend, (n, target, related)| {
            backend.with_page(link(*n), *target, related.iter().map(|r| link(*r)).collect())
        },
    )
}

/// Records dispatched links instead of fetching them
#[derive(Clone, Default)]
pub(super) struct RecordingDispatcher {
    dispatched: Arc<Mutex<VecDeque<Link>>>,
}

impl FetchDispatch for RecordingDispatcher {
    fn dispatch(&self, link: Link) {
        self.dispatched.lock().unwrap().push_back(link);
    }
}

/// Explorer driven by hand: fetches are recorded, completions injected
pub(super) struct Harness {
    pub explorer: LinkGraphExplorer,
    pub events: broadcast::Receiver<Event>,
    dispatched: Arc<Mutex<VecDeque<Link>>>,
}

impl Harness {
    pub fn new(prefetch_count: usize) -> Self {
        let (event_tx, events) = broadcast::channel(1000);
        let dispatcher = RecordingDispatcher::default();
        let dispatched = Arc::clone(&dispatcher.dispatched);
        let explorer = LinkGraphExplorer::new(prefetch_count, Box::new(dispatcher), event_tx);
        Self {
            explorer,
            events,
            dispatched,
        }
    }

    /// Links dispatched since the last call, in dispatch order
    pub fn take_dispatched(&self) -> Vec<Link> {
        self.dispatched.lock().unwrap().drain(..).collect()
    }

    /// Oldest outstanding dispatch, if any
    pub fn pop_dispatched(&self) -> Option<Link> {
        self.dispatched.lock().unwrap().pop_front()
    }

    /// Events emitted since the last call
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Deliver a successful fetch of `result.requesting_link`
    pub fn complete(&mut self, result: FetchResult) -> crate::Result<()> {
        self.explorer.handle_fetch_outcome(FetchOutcome {
            link: result.requesting_link.clone(),
            result: Ok(result),
        })
    }

    /// Every discovered link must be pending or used, never both
    pub fn assert_partitioned(&self, discovered: &[Link]) {
        for l in discovered {
            let pending = self.explorer.link_state(l).is_some();
            let used = self.explorer.is_used(l);
            assert!(
                pending ^ used,
                "{} must be in exactly one of graph/used (pending={pending}, used={used})",
                l.url
            );
        }
    }
}

pub(super) fn found_urls(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::SongFound { link } => Some(link.url.clone()),
            _ => None,
        })
        .collect()
}

pub(super) fn ready_urls(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::DownloadTargetReady { link, .. } => Some(link.url.clone()),
            _ => None,
        })
        .collect()
}

pub(super) fn exhausted_count(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::SearchExhausted))
        .count()
}
