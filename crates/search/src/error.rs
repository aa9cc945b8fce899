use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Client error: {0}")]
    ClientError(#[from] lmrisk_client::ClientError),

    #[error("Empty query")]
    EmptyQuery,

    #[error("{0}")]
    Other(String),
}
