#![deny(unsafe_code)]

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid segment name: {0}")]
    InvalidSegmentName(String),
    #[error("invalid resource path: {0}")]
    InvalidPath(String),
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
