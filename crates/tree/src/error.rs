use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TreeError>;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Failed to read entry: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid workspace root: {0}")]
    InvalidRoot(String),

    #[error("Watcher error: {0}")]
    WatchError(String),
}
