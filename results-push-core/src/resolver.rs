//! Locates a logical directory name under an ordered list of base paths.

use std::path::PathBuf;
use tracing::debug;

/// Ordered candidate base directories. Earlier entries are more
/// authoritative and win when several contain the same name.
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    candidates: Vec<PathBuf>,
}

impl PathResolver {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// First `<base>/<logical_name>` that exists as a directory.
    pub fn resolve(&self, logical_name: &str) -> Option<PathBuf> {
        if logical_name.is_empty() {
            debug!("Refusing to resolve an empty directory name");
            return None;
        }
        let found = self
            .candidates
            .iter()
            .map(|base| base.join(logical_name))
            .find(|path| path.is_dir());
        match &found {
            Some(path) => debug!(name = logical_name, path = %path.display(), "Resolved directory"),
            None => debug!(
                name = logical_name,
                candidates = self.candidates.len(),
                "Directory not found under any candidate"
            ),
        }
        found
    }
}
