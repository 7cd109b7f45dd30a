pub mod ai;
pub mod config;
pub mod dispatch;
pub mod speech;
pub mod transcript;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CompanionError {
    #[error("AI client error: {0}")]
    AiError(String),

    #[error("Speech synthesis error: {0}")]
    SynthesisError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),
}

pub type Result<T> = std::result::Result<T, CompanionError>;
