use broker_amf0::Amf0ReadError;
use thiserror::Error;

use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("malformed data message: {0}")]
    MalformedData(String),
    #[error("stream key {0:?} already has a publisher")]
    StreamKeyInUse(String),
}

impl From<Amf0ReadError> for DataError {
    fn from(err: Amf0ReadError) -> Self {
        DataError::MalformedData(err.to_string())
    }
}

impl From<RegistryError> for DataError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::StreamKeyInUse(key) => DataError::StreamKeyInUse(key),
        }
    }
}
