use thiserror::Error;

/// Failure surfaced by the batch driver. Markdown itself never fails to
/// parse; only reading the input can.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to read markdown input: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse parser options: {0}")]
    Json(#[from] serde_json::Error),
}
