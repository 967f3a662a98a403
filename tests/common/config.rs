//! Test configuration helpers

use std::path::Path;
use std::time::Duration;
use song_finder::Config;

/// Config writing into `output_dir`, with fast polling and no PATH search
pub fn test_config(output_dir: &Path) -> Config {
    let mut config = Config::default();
    config.download.output_dir = output_dir.to_path_buf();
    config.download.poll_interval = Duration::from_millis(20);
    config.tools.search_path = false;
    config
}

/// Config whose downloads time out after `timeout`
pub fn config_with_timeout(output_dir: &Path, timeout: Duration) -> Config {
    let mut config = test_config(output_dir);
    // timeout = 2 * size / 1 MB/s
    config.download.expected_max_size_mb = timeout.as_secs_f64() / 2.0;
    config
}

/// Whether a youtube-dl compatible tool is installed
pub fn has_youtube_dl() -> bool {
    song_finder::YoutubeDl::from_path(&Default::default()).is_some()
}

/// Skip the current test if no youtube-dl compatible tool is installed
#[macro_export]
macro_rules! skip_if_no_youtube_dl {
    () => {
        if !$crate::common::has_youtube_dl() {
            eprintln!("Skipping test: neither youtube-dl nor yt-dlp found in PATH");
            return;
        }
    };
}
