//! Core types for song-finder

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::error::DownloadErrorReason;

/// A discoverable song search result
///
/// The url is the identity of a link: two links with the same url are the
/// same link even if the site reported different display metadata for them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Link {
    /// Artist name as shown by the search site
    pub artist: String,
    /// Song title as shown by the search site
    pub title: String,
    /// Page url on the search site
    pub url: String,
}

impl Link {
    /// Create a new Link
    pub fn new(
        artist: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            url: url.into(),
        }
    }
}

impl PartialEq for Link {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for Link {}

impl Hash for Link {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

impl std::fmt::Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {} <{}>", self.artist, self.title, self.url)
    }
}

/// What the backend found on a link's page
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    /// The link whose page was fetched
    pub requesting_link: Link,
    /// Url handed to the audio extraction tool, if the page had one
    pub download_target: Option<String>,
    /// Related songs listed on the page, in page order
    pub related_links: Vec<Link>,
}

/// Fetch state of a cached link record
///
/// Ordered: a record only ever moves to a greater state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    /// Known but never fetched
    #[default]
    Uninitialized,
    /// Fetch dispatched, result pending
    Downloading,
    /// Fetch result cached
    Complete,
}

/// Lifecycle state of a download job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    /// Waiting in the queue
    Queued,
    /// External tool running
    Running,
    /// Tool exited with status 0
    Succeeded,
    /// Tool exited non-zero or could not be run
    Failed,
    /// Tool was killed after exceeding the timeout
    TimedOut,
}

impl DownloadState {
    /// Whether the job has finished, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadState::Succeeded | DownloadState::Failed | DownloadState::TimedOut
        )
    }
}

/// Event emitted by the search and download services
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A new candidate song was discovered
    SongFound {
        /// The discovered link
        link: Link,
    },

    /// No undecided songs remain for the current search
    SearchExhausted,

    /// The initial search could not be performed
    SearchFailed {
        /// Search text that was submitted
        search_text: String,
        /// Error message
        error: String,
    },

    /// An accepted song's page has been read and its download target is known
    DownloadTargetReady {
        /// The accepted link
        link: Link,
        /// Url for the audio extraction tool (`None` if the page had none)
        url: Option<String>,
    },

    /// Fetching a link's page failed
    FetchFailed {
        /// The link whose fetch failed
        link: Link,
        /// Error message
        error: String,
    },

    /// Url added to the download queue
    DownloadQueued {
        /// Download url
        url: String,
    },

    /// External tool started for a url
    DownloadStarted {
        /// Download url
        url: String,
    },

    /// External tool finished with status 0
    DownloadComplete {
        /// Download url
        url: String,
    },

    /// Download ended without success
    DownloadError {
        /// Download url
        url: String,
        /// Why the download failed
        reason: DownloadErrorReason,
    },

    /// A service shut down
    Shutdown,
}
