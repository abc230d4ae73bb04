use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MatchError {
    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("remote source returned status {code}: {message}")]
    ApiError { code: u16, message: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("invalid profile key: {0}")]
    InvalidProfileKey(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    #[error("no signed-in profile; run an identity fetch first")]
    SelfProfileMissing,
}

impl MatchError {
    /// Failures of the remote source, as opposed to local ones.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            MatchError::NetworkFailure(_) | MatchError::ApiError { .. }
        )
    }
}
