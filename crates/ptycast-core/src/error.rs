//! Error types for Ptycast.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PtycastError {
    #[error("Status banner in detector '{detector}' failed strict parsing: {reason}")]
    StatusParse { detector: String, reason: String },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
