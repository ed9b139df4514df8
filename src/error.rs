// src/error.rs
//
// Error taxonomy for the analysis pipeline.

use thiserror::Error;

/// Errors that can terminate a single analysis call.
///
/// Gate rejections are not errors; they are a regular
/// [`CryVerdict`](crate::detection::CryVerdict) outcome.
#[derive(Error, Debug)]
pub enum CryError {
    /// Input audio could not be parsed or produced no samples
    #[error("decode error: {0}")]
    Decode(String),

    /// Feature extraction could not run at all
    #[error("analysis error: {0}")]
    Analysis(String),

    /// A tensor or vector with the wrong shape reached a model
    #[error("inference error: {0}")]
    Inference(String),

    /// A model artifact is missing, unreadable or inconsistent
    #[error("model error: {0}")]
    Model(String),

    /// Pipeline configuration is invalid
    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<symphonia::core::errors::Error> for CryError {
    fn from(e: symphonia::core::errors::Error) -> Self {
        CryError::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CryError>;
