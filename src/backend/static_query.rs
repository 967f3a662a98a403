//! In-memory backend over a fixed link graph

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use super::traits::WebQueryBackend;
use crate::types::{FetchResult, Link};

/// Backend serving a fixed, in-memory set of search results and pages
///
/// Useful for tests and demos. An optional latency is applied to every page
/// fetch to imitate a slow site.
#[derive(Clone, Debug, Default)]
pub struct StaticWebQuery {
    searches: HashMap<String, Link>,
    pages: HashMap<Link, (Option<String>, Vec<Link>)>,
    latency: Option<Duration>,
}

impl StaticWebQuery {
    /// Create an empty backend (every search misses)
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `search_text` with `link`
    pub fn with_search(mut self, search_text: impl Into<String>, link: Link) -> Self {
        self.searches.insert(search_text.into(), link);
        self
    }

    /// Register the page for `link`
    pub fn with_page(
        mut self,
        link: Link,
        download_target: Option<&str>,
        related_links: Vec<Link>,
    ) -> Self {
        self.pages
            .insert(link, (download_target.map(str::to_string), related_links));
        self
    }

    /// Delay every page fetch by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl WebQueryBackend for StaticWebQuery {
    async fn initial_link(&self, search_text: &str) -> crate::Result<Option<Link>> {
        Ok(self.searches.get(search_text).cloned())
    }

    async fn related_and_target(&self, link: &Link) -> crate::Result<FetchResult> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let (download_target, related_links) = self
            .pages
            .get(link)
            .cloned()
            .ok_or_else(|| crate::Error::Backend(format!("no page for {}", link.url)))?;
        Ok(FetchResult {
            requesting_link: link.clone(),
            download_target,
            related_links,
        })
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
