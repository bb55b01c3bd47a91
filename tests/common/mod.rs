//! Shared fixtures for integration tests.

use std::path::Path;

use savegame_cli::config::Settings;
use savegame_cli::engine::Session;
use savegame_cli::snapshot::NoSnapshot;

/// Snapshotting disabled for every integration scenario.
pub static NO_SNAPSHOT: NoSnapshot = NoSnapshot;

/// Parse settings content, panicking on fixture bugs.
pub fn parse_settings(content: &str) -> Settings {
    Settings::parse(content, "fixture.cfg").expect("fixture settings should parse")
}

/// Build a session over `out` with snapshotting disabled.
pub fn make_session<'a>(settings: &'a Settings, out: &Path, backlink: bool) -> Session<'a> {
    Session::new(
        settings,
        &NO_SNAPSHOT,
        out.to_path_buf(),
        backlink,
        "testhost".to_string(),
    )
}

/// Create a file with all parent directories.
pub fn write_file(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create fixture parents");
    }
    std::fs::write(path, content).expect("write fixture file");
}
