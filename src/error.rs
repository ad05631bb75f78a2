//! Error type for the footstep library.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FootstepError>;

#[derive(Debug, Error)]
pub enum FootstepError {
    #[error("position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("host reported a non-finite position {0}")]
    NonFinitePosition(crate::types::Position),

    #[error("position fetch did not complete within {0:?}")]
    PositionTimeout(std::time::Duration),

    #[error("payload codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("host service error: {0}")]
    Host(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no footstep sound assets configured")]
    NoSoundAssets,
}
