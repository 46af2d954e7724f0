use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Upstream answered with a non-success status.
    #[error("Upstream API error (status {status}): {body}")]
    Transport { status: u16, body: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Strategy precondition failed: {0}")]
    Precondition(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Transport and parse failures are worth retrying or skipping by the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::Transport { .. } | PipelineError::Http(_) | PipelineError::Parse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
