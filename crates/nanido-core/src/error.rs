use thiserror::Error;

#[derive(Debug, Error)]
pub enum NanidoError {
    /// The expected top-level shape of a source document is absent.
    /// Fatal for the whole import run.
    #[error("source structure error: {0}")]
    Source(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
