use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrilhaError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("authority error: {0}")]
    Authority(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl From<reqwest::Error> for TrilhaError {
    fn from(e: reqwest::Error) -> Self {
        TrilhaError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TrilhaError>;
