use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    /// The service declined the content type (HTTP 406). Not a failure.
    #[error("Content type not supported by the service")]
    Unsupported,

    #[error("Invalid response: {0}")]
    DecodeError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{0} is not available from this backend")]
    Unavailable(&'static str),

    #[error("{0}")]
    Other(String),
}

impl ClientError {
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported)
    }
}
