//! Secret-word list loading.

use std::path::Path;

use tracing::{info, warn};

/// Loads candidate secret words from a file, one per line.
///
/// Missing or unreadable files are not fatal: the room config falls
/// back to its built-in list when handed an empty one.
pub fn load(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let words = parse(&contents);
            info!(path = %path.display(), count = words.len(), "loaded word list");
            words
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "word list unavailable, using built-ins");
            Vec::new()
        }
    }
}

/// One word per line, uppercased; blank lines are skipped.
fn parse(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_uppercase)
        .collect()
}
