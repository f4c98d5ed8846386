use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Invalid media URL: {0}")]
    InvalidInput(String),

    #[error("Request failed with status {status}: {message}")]
    Request { status: u16, message: String },

    #[error("Could not reach the download server: {0}")]
    Network(String),

    #[error("Server returned an empty response body")]
    EmptyBody,

    #[error("Stream read error: {0}")]
    StreamRead(String),

    #[error("Response did not start with a metadata header")]
    MissingMetadata,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("A download is already in progress")]
    Busy,
}
