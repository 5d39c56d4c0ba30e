use broker_amf0::{Amf0ReadError, Amf0WriteError};
use thiserror::Error;

use crate::connection::WriteError;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("malformed command: {0}")]
    MalformedCommand(String),
    #[error("play requested for a stream with no publisher")]
    PublisherMissing,
    #[error("publisher session readiness resolved to failure")]
    PublisherFailed,
    #[error("outbound write failed: {0}")]
    WriteFailed(#[from] WriteError),
    #[error("failed to encode outbound amf0 payload: {0}")]
    Encode(#[from] Amf0WriteError),
    #[error("unsupported command: {0}")]
    Unsupported(String),
}

impl From<Amf0ReadError> for CommandError {
    fn from(err: Amf0ReadError) -> Self {
        CommandError::MalformedCommand(err.to_string())
    }
}
