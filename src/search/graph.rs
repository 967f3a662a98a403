//! Insertion-ordered cache of links that are known but not yet decided.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::{Link, LinkState};

/// Per-link cache entry
#[derive(Clone, Debug, Default)]
pub(crate) struct LinkRecord {
    state: LinkState,
    related_links: Vec<Link>,
    download_target: Option<String>,
    download_requested: bool,
}

impl LinkRecord {
    pub(crate) fn state(&self) -> LinkState {
        self.state
    }

    pub(crate) fn related_links(&self) -> &[Link] {
        &self.related_links
    }

    pub(crate) fn download_target(&self) -> Option<&str> {
        self.download_target.as_deref()
    }

    pub(crate) fn download_requested(&self) -> bool {
        self.download_requested
    }

    /// Sticky: once requested, a download stays requested.
    pub(crate) fn request_download(&mut self, wants_download: bool) {
        self.download_requested |= wants_download;
    }

    /// Uninitialized -> Downloading
    pub(crate) fn set_downloading(&mut self, url: &str) -> Result<()> {
        self.transition(url, LinkState::Uninitialized, LinkState::Downloading)
    }

    /// Downloading -> Complete, caching the page contents
    pub(crate) fn set_received_data(
        &mut self,
        url: &str,
        download_target: Option<String>,
        related_links: Vec<Link>,
    ) -> Result<()> {
        self.transition(url, LinkState::Downloading, LinkState::Complete)?;
        self.download_target = download_target;
        self.related_links = related_links;
        Ok(())
    }

    fn transition(&mut self, url: &str, from: LinkState, to: LinkState) -> Result<()> {
        if self.state != from {
            return Err(Error::InvalidStateTransition {
                url: url.to_string(),
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}

/// Links known but not yet finalized, in discovery order
///
/// A key sequence paired with a keyed lookup table; iteration and
/// [`first_uninitialized`](Self::first_uninitialized) follow insertion order,
/// which makes prefetch sequencing deterministic.
#[derive(Debug, Default)]
pub(crate) struct LinkGraph {
    order: Vec<Link>,
    records: HashMap<Link, LinkRecord>,
}

impl LinkGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add an Uninitialized record; returns false if the link is already present
    pub(crate) fn insert(&mut self, link: Link) -> bool {
        if self.records.contains_key(&link) {
            return false;
        }
        self.order.push(link.clone());
        self.records.insert(link, LinkRecord::default());
        true
    }

    pub(crate) fn contains(&self, link: &Link) -> bool {
        self.records.contains_key(link)
    }

    pub(crate) fn get(&self, link: &Link) -> Option<&LinkRecord> {
        self.records.get(link)
    }

    pub(crate) fn get_mut(&mut self, link: &Link) -> Option<&mut LinkRecord> {
        self.records.get_mut(link)
    }

    pub(crate) fn remove(&mut self, link: &Link) -> Option<LinkRecord> {
        let record = self.records.remove(link)?;
        self.order.retain(|l| l != link);
        Some(record)
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records fetching or fetched: the occupied part of the prefetch window
    pub(crate) fn in_flight_count(&self) -> usize {
        self.records
            .values()
            .filter(|r| r.state != LinkState::Uninitialized)
            .count()
    }

    /// Earliest-discovered record that has never been fetched
    pub(crate) fn first_uninitialized(&self) -> Option<&Link> {
        self.order
            .iter()
            .find(|l| self.records.get(*l).map(LinkRecord::state) == Some(LinkState::Uninitialized))
    }

    /// Links in discovery order
    pub(crate) fn links(&self) -> impl Iterator<Item = &Link> {
        self.order.iter()
    }
}
