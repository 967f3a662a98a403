//! Sequential audio downloads through an external extraction tool.
//!
//! - [`extractor`] - the [`AudioExtractor`] seam and the youtube-dl CLI
//! - [`supervisor`] - FIFO queue, one running process, timeout enforcement
//! - [`service`] - the control task that owns a supervisor, and its handle

mod extractor;
mod job;
mod service;
mod supervisor;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use extractor::{
    AudioExtractor, ExtractionProcess, ProcessExit, UnavailableExtractor, YoutubeDl, build_args,
    resolve_extractor,
};
pub use job::DownloadJob;
pub use service::{DownloadCommand, DownloadHandle};
pub use supervisor::DownloadQueueSupervisor;

pub(crate) use service::spawn_downloader;
