//! Error types for the enclave-connect crate

use enclave_core_interface::TransportError;
use thiserror::Error;

/// Failure to build or open a transport
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("Invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<ConnectError> for TransportError {
    fn from(err: ConnectError) -> Self {
        TransportError::Unreachable {
            code: None,
            message: err.to_string(),
        }
    }
}
