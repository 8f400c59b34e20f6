use thiserror::Error;

#[derive(Error, Debug)]
pub enum GerberError {
    #[error("parse error: {0}")]
    ParseError(String),

    #[error("boolean operation failed: {0}")]
    BooleanError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
