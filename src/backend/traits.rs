//! The web query capability consumed by the search service

use async_trait::async_trait;

use crate::types::{FetchResult, Link};

/// Trait for song search sites
///
/// A backend answers two questions: where does a search start, and what does
/// a song's page link to. Implementations may be slow (network round trips);
/// the search service always calls them off its control task.
///
/// # Examples
///
/// ```
/// use song_finder::backend::{StaticWebQuery, WebQueryBackend};
/// use song_finder::Link;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let start = Link::new("artist_1", "song_1", "link_1");
/// let backend = StaticWebQuery::new()
///     .with_search("find_me", start.clone())
///     .with_page(start.clone(), Some("youtube_1"), vec![]);
///
/// let found = backend.initial_link("find_me").await?;
/// assert_eq!(found, Some(start.clone()));
///
/// let page = backend.related_and_target(&start).await?;
/// assert_eq!(page.download_target.as_deref(), Some("youtube_1"));
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait WebQueryBackend: Send + Sync {
    /// Find the first song matching the search text
    ///
    /// Returns `Ok(None)` when the site has no match.
    async fn initial_link(&self, search_text: &str) -> crate::Result<Option<Link>>;

    /// Read a song's page: its download target and related songs
    ///
    /// The returned [`FetchResult::requesting_link`] must be `link`.
    async fn related_and_target(&self, link: &Link) -> crate::Result<FetchResult>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
