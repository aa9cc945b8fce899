use lmrisk_protocol::EntropyResult;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone)]
struct CachedEntropy {
    modified: Option<SystemTime>,
    result: EntropyResult,
}

/// Scoring results per absolute file path, stamped with the file mtime.
#[derive(Debug, Clone, Default)]
pub struct EntropyCache {
    entries: HashMap<PathBuf, CachedEntropy>,
}

impl EntropyCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, modified: Option<SystemTime>, result: EntropyResult) {
        self.entries
            .insert(path.into(), CachedEntropy { modified, result });
    }

    /// Cached result unless the file changed after it was stored.
    #[must_use]
    pub fn get(&self, path: &Path, modified: Option<SystemTime>) -> Option<&EntropyResult> {
        let entry = self.entries.get(path)?;
        match (entry.modified, modified) {
            (Some(stored), Some(current)) if current > stored => None,
            _ => Some(&entry.result),
        }
    }

    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.entries.remove(path).is_some()
    }

    /// Drop every entry at or below `prefix`. Returns the number removed.
    pub fn invalidate_under(&mut self, prefix: &Path) -> usize {
        let before = self.entries.len();
        self.entries.retain(|path, _| !path.starts_with(prefix));
        before - self.entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn result() -> EntropyResult {
        EntropyResult {
            languagemodel: "stub".to_string(),
            ..EntropyResult::default()
        }
    }

    #[test]
    fn newer_mtime_is_a_miss() {
        let mut cache = EntropyCache::new();
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(10);
        let path = Path::new("/ws/a.java");
        cache.insert(path, Some(t0), result());

        assert!(cache.get(path, Some(t0)).is_some());
        assert!(cache.get(path, Some(t0 - Duration::from_secs(1))).is_some());
        assert!(cache.get(path, Some(t0 + Duration::from_secs(1))).is_none());
        assert!(cache.get(Path::new("/ws/b.java"), Some(t0)).is_none());
    }

    #[test]
    fn invalidation_by_path_and_prefix() {
        let mut cache = EntropyCache::new();
        cache.insert("/ws/a.java", None, result());
        cache.insert("/ws/src/b.java", None, result());
        cache.insert("/ws/src/c.java", None, result());

        assert!(cache.invalidate(Path::new("/ws/a.java")));
        assert!(!cache.invalidate(Path::new("/ws/a.java")));
        assert_eq!(cache.invalidate_under(Path::new("/ws/src")), 2);
        assert!(cache.is_empty());
    }
}
