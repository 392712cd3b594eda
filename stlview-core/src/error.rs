use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("unknown representation code {0} (expected 0, 1 or 2)")]
    UnknownRepresentation(u8),

    #[error("render surface error: {0}")]
    Surface(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ViewerError>;
