#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    #[error("type checker stopped: {0}")]
    Check(#[from] lox_typing::CheckError),
    /// Diagnostics were already printed.
    #[error("diagnostics reported")]
    Diagnostics,
}
