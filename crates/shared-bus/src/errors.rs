//! Transport errors.

use shared_types::codes;
use shared_types::DopError;
use thiserror::Error;

/// Errors from input and output transports.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The transport was closed.
    #[error("Transport closed")]
    Closed,

    /// Nobody is listening on the destination.
    #[error("No receivers for destination '{0}'")]
    NoReceivers(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<TransportError> for DopError {
    fn from(e: TransportError) -> Self {
        DopError::from(codes::ERR_SERVER)
            .silent()
            .caused_by(DopError::new(0, e.to_string()))
    }
}
