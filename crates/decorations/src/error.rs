use thiserror::Error;

pub type Result<T> = std::result::Result<T, DecorationError>;

#[derive(Error, Debug)]
pub enum DecorationError {
    #[error("Invalid symbol pattern: {0}")]
    PatternError(#[from] regex::Error),

    #[error("Expected {ranges} colors for {ranges} ranges, got {colors}")]
    ColorCountMismatch { ranges: usize, colors: usize },

    #[error("Range bounds must be ascending: {0:?}")]
    UnorderedRanges(Vec<f64>),
}
