use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Resolve a path to the key used for deduplication.
///
/// Paths that do not exist (yet, or any more) cannot be canonicalized; those
/// resolve through their deepest existing ancestor, so repeated events for a
/// moved file still collapse onto the same key.
pub fn canonical_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut missing = Vec::new();
    let mut current = absolute.as_path();
    loop {
        if let Ok(existing) = current.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(existing, |resolved, name| resolved.join(name));
        }
        match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                current = parent;
            }
            _ => return absolute.clone(),
        }
    }
}

/// Paths already attempted by one action instance. Only ever grows.
#[derive(Debug, Default)]
pub struct ProcessedSet {
    paths: HashSet<PathBuf>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a canonical path. Returns `false` if it was already attempted.
    pub fn insert(&mut self, path: &Path) -> bool {
        if self.paths.contains(path) {
            return false;
        }
        self.paths.insert(path.to_path_buf())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
