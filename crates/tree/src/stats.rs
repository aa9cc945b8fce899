use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Statistics about a workspace scan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanStats {
    /// Number of files added to the tree
    pub files: usize,

    /// Number of directories kept after pruning
    pub directories: usize,

    /// Directories removed because nothing below them survived filtering
    pub pruned_directories: usize,

    /// Files dropped by the extension filter
    pub skipped_files: usize,

    /// Total lines across all files
    pub total_lines: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,

    /// Files per language id (extension without the dot)
    pub languages: HashMap<String, usize>,

    /// Errors encountered
    pub errors: Vec<String>,
}

impl ScanStats {
    pub fn new() -> Self {
        Self {
            files: 0,
            directories: 0,
            pruned_directories: 0,
            skipped_files: 0,
            total_lines: 0,
            time_ms: 0,
            languages: HashMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn add_file(&mut self, language: &str, lines: usize) {
        self.files += 1;
        self.total_lines += lines;
        *self.languages.entry(language.to_string()).or_insert(0) += 1;
    }

    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }
}

impl Default for ScanStats {
    fn default() -> Self {
        Self::new()
    }
}
