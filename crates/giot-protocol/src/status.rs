//! Request-level status codes.

use serde::{Deserialize, Serialize};

/// Status of a whole request, encoded as an integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum ReplyStatus {
    /// Replies are filled with valid data.
    Success,
    /// The request could not be interpreted.
    SyntaxError,
    /// Invalid combination, such as raw values for a non-sensor region.
    InvalidRequest,
    /// Values outside what the server can offer.
    RangeError,
    /// The server is not working correctly now, try again.
    ServerError,
}

impl ReplyStatus {
    pub const fn code(&self) -> i32 {
        match self {
            ReplyStatus::Success => 0,
            ReplyStatus::SyntaxError => 1,
            ReplyStatus::InvalidRequest => 2,
            ReplyStatus::RangeError => 3,
            ReplyStatus::ServerError => 4,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ReplyStatus::Success)
    }
}

impl From<ReplyStatus> for i32 {
    fn from(status: ReplyStatus) -> Self {
        status.code()
    }
}

impl TryFrom<i32> for ReplyStatus {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ReplyStatus::Success),
            1 => Ok(ReplyStatus::SyntaxError),
            2 => Ok(ReplyStatus::InvalidRequest),
            3 => Ok(ReplyStatus::RangeError),
            4 => Ok(ReplyStatus::ServerError),
            other => Err(format!("unknown status code {}", other)),
        }
    }
}

impl std::fmt::Display for ReplyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReplyStatus::Success => "Success",
            ReplyStatus::SyntaxError => "SyntaxError",
            ReplyStatus::InvalidRequest => "InvalidRequest",
            ReplyStatus::RangeError => "RangeError",
            ReplyStatus::ServerError => "ServerError",
        };
        f.write_str(name)
    }
}
