//! Error types for query execution.

use std::time::Duration;

use giot_protocol::{ProtocolError, ReplyStatus};
use sensor_store::StoreError;
use thiserror::Error;

/// Reasons a request fails as a whole.
///
/// Data gaps are never errors; they surface as NaN cells.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The request is malformed.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// The request is well formed but asks for something inconsistent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Time, region or dataset outside what the server can provide.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// Storage collaborator failure.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// The request did not finish in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Encoding or decoding of a wire structure failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Invalid engine or coverage configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::Syntax(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn out_of_range(msg: impl Into<String>) -> Self {
        Self::OutOfRange(msg.into())
    }

    /// Status code carried by the reply container.
    pub fn status(&self) -> ReplyStatus {
        match self {
            Self::Syntax(_) => ReplyStatus::SyntaxError,
            Self::InvalidRequest(_) => ReplyStatus::InvalidRequest,
            Self::OutOfRange(_) => ReplyStatus::RangeError,
            Self::Protocol(e) => e.status(),
            Self::Storage(_) | Self::Timeout(_) | Self::Config(_) => ReplyStatus::ServerError,
        }
    }
}

impl From<serde_yaml::Error> for EngineError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for query engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
