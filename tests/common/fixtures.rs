//! Search graphs and stand-in extraction tools

use std::path::{Path, PathBuf};
use song_finder::{Link, StaticWebQuery};

/// The "find_me" graph: (n, download target, related links)
pub const FIND_ME: &[(u32, Option<&str>, &[u32])] = &[
    (1, Some("https://www.youtube.com/watch?v=1"), &[2, 3, 4]),
    (2, Some("https://www.youtube.com/watch?v=2"), &[4, 5, 6]),
    (3, None, &[2, 3]),
    (4, Some("https://www.youtube.com/watch?v=4"), &[7]),
    (5, Some("https://www.youtube.com/watch?v=5"), &[]),
    (6, Some("https://www.youtube.com/watch?v=6"), &[]),
    (7, Some("https://www.youtube.com/watch?v=7"), &[]),
];

/// Song `n` of the find_me graph
pub fn song(n: u32) -> Link {
    Link::new(
        format!("artist_{n}"),
        format!("song_{n}"),
        format!("https://songs.example/song/{n}"),
    )
}

/// In-memory backend serving the find_me graph for the search "find_me"
pub fn find_me_backend() -> StaticWebQuery {
    FIND_ME.iter().fold(
        StaticWebQuery::new().with_search("find_me", song(1)),
        |backend, (n, target, related)| {
            backend.with_page(song(*n), *target, related.iter().map(|r| song(*r)).collect())
        },
    )
}

/// Download targets of the find_me graph, in song order
pub fn find_me_targets() -> Vec<String> {
    FIND_ME
        .iter()
        .filter_map(|(_, target, _)| target.map(str::to_string))
        .collect()
}

/// Records its arguments to `invocations.txt` in the working directory, then succeeds
pub const RECORDING_TOOL: &str = "#!/bin/sh\nprintf '%s\\n' \"$@\" >> invocations.txt\nexit 0\n";

/// Exits with status 3
pub const FAILING_TOOL: &str = "#!/bin/sh\nexit 3\n";

/// Never finishes on its own
pub const HANGING_TOOL: &str = "#!/bin/sh\nexec sleep 30\n";

/// Succeeds for urls ending in `ok`, hangs otherwise
pub const PICKY_TOOL: &str = "#!/bin/sh\nfor last; do :; done\ncase \"$last\" in\n  *ok) exit 0 ;;\n  *) exec sleep 30 ;;\nesac\n";

/// Write an executable shell script named `name` into `dir`
#[cfg(unix)]
pub fn write_tool(dir: &Path, name: &str, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, script).expect("failed to write tool script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("failed to make tool script executable");
    path
}
