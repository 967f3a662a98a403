//! Song search site backends
//!
//! The core abstraction is the [`WebQueryBackend`] trait. Implementations:
//!
//! - [`HttpWebQuery`]: fetches real pages over HTTP, with the site-specific
//!   HTML handling supplied as a [`PageParser`]
//! - [`StaticWebQuery`]: fixed in-memory graph, for tests and demos

mod http;
mod static_query;
mod traits;

pub use http::{HttpWebQuery, PageParser, QUERY_PLACEHOLDER, resolve_href};
pub use static_query::StaticWebQuery;
pub use traits::WebQueryBackend;
