use thiserror::Error;

pub type FineTuneResult<T> = std::result::Result<T, FineTuneError>;

#[derive(Debug, Error)]
pub enum FineTuneError {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("generator error: {0}")]
    Generator(String),

    #[error("trainer error: {0}")]
    Trainer(String),

    #[error("registry error: {0}")]
    Registry(String),

    #[error("artifact error: {0}")]
    Artifact(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
