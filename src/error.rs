use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("http error: {0}")]
    Http(#[from] ureq::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// User input rejected before any request was made.
    #[error("{0}")]
    Validation(String),

    /// The backend answered with `ok: false` or a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
