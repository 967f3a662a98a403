//! HTTP backend: fetches search-site pages and hands them to a site parser

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::traits::WebQueryBackend;
use crate::error::{Error, Result};
use crate::types::{FetchResult, Link};

/// Timeout for a single page request
const PAGE_FETCH_TIMEOUT_SECS: u64 = 30;

/// Placeholder replaced by the url-encoded search text
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// Interprets the HTML of one particular search site
///
/// `page_url` is the address the page was served from, for resolving
/// relative links (see [`resolve_href`]).
pub trait PageParser: Send + Sync {
    /// Pick the first song out of a search results page
    fn initial_link(&self, page: &str, page_url: &Url) -> Option<Link>;

    /// Pull the download target and related songs out of a song page
    fn related_and_target(&self, page: &str, page_url: &Url) -> (Option<String>, Vec<Link>);
}

/// Backend that talks to a search site over HTTP
///
/// Request construction is generic: the search url is built from a template
/// containing [`QUERY_PLACEHOLDER`], and song pages are fetched from their
/// link urls. All site-specific knowledge lives in the [`PageParser`].
pub struct HttpWebQuery {
    client: reqwest::Client,
    search_url_template: String,
    parser: Arc<dyn PageParser>,
}

impl HttpWebQuery {
    /// Create a backend for the site described by `search_url_template` and `parser`
    ///
    /// # Errors
    ///
    /// Returns a config error if the template lacks [`QUERY_PLACEHOLDER`], or an
    /// I/O error if the HTTP client cannot be built.
    pub fn new(search_url_template: impl Into<String>, parser: Arc<dyn PageParser>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(PAGE_FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                Error::Io(std::io::Error::other(format!(
                    "Failed to create HTTP client: {}",
                    e
                )))
            })?;
        Self::with_client(client, search_url_template, parser)
    }

    /// Same as [`new`](Self::new) with a caller-supplied client
    pub fn with_client(
        client: reqwest::Client,
        search_url_template: impl Into<String>,
        parser: Arc<dyn PageParser>,
    ) -> Result<Self> {
        let search_url_template = search_url_template.into();
        if !search_url_template.contains(QUERY_PLACEHOLDER) {
            return Err(Error::config(
                "search_url_template",
                format!("must contain {}", QUERY_PLACEHOLDER),
            ));
        }
        Ok(Self {
            client,
            search_url_template,
            parser,
        })
    }

    /// Search page url for `search_text`
    pub fn search_url(&self, search_text: &str) -> Result<Url> {
        let raw = self
            .search_url_template
            .replace(QUERY_PLACEHOLDER, &urlencoding::encode(search_text));
        Url::parse(&raw).map_err(|e| Error::Backend(format!("invalid search url '{}': {}", raw, e)))
    }

    /// Fetch a page body as text
    pub async fn download_web_page(&self, url: &Url) -> Result<String> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            let error_msg = if e.is_timeout() {
                format!(
                    "Timeout fetching '{}' (exceeded {} seconds)",
                    url, PAGE_FETCH_TIMEOUT_SECS
                )
            } else if e.is_connect() {
                format!("Connection failed for '{}': {}", url, e)
            } else {
                format!("Failed to fetch '{}': {}", url, e)
            };
            Error::Backend(error_msg)
        })?;

        if !response.status().is_success() {
            return Err(Error::Backend(format!(
                "HTTP error fetching page: {} {}",
                response.status(),
                url
            )));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl WebQueryBackend for HttpWebQuery {
    async fn initial_link(&self, search_text: &str) -> Result<Option<Link>> {
        let url = self.search_url(search_text)?;
        let page = self.download_web_page(&url).await?;
        Ok(self.parser.initial_link(&page, &url))
    }

    async fn related_and_target(&self, link: &Link) -> Result<FetchResult> {
        let url = Url::parse(&link.url)
            .map_err(|e| Error::Backend(format!("invalid link url '{}': {}", link.url, e)))?;
        let page = self.download_web_page(&url).await?;
        let (download_target, related_links) = self.parser.related_and_target(&page, &url);
        tracing::debug!(
            url = %link.url,
            has_target = download_target.is_some(),
            related = related_links.len(),
            "Parsed song page"
        );
        Ok(FetchResult {
            requesting_link: link.clone(),
            download_target,
            related_links,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Resolve an `href` found on `page_url` to an absolute url
pub fn resolve_href(page_url: &Url, href: &str) -> Option<String> {
    page_url.join(href).ok().map(String::from)
}
