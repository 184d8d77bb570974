/*!
 * Error types for the enclave client
 */

use enclave_connect::ConnectError;
use enclave_core_interface::TransportError;
use std::fmt;
use std::io;
use thiserror::Error;

use crate::partition::PartitionError;

pub type Result<T> = std::result::Result<T, EnclaveError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_REJECTED: i32 = 1;
pub const EXIT_INVALID: i32 = 2;
pub const EXIT_UNREACHABLE: i32 = 3;
pub const EXIT_PROTOCOL: i32 = 4;
pub const EXIT_IO: i32 = 5;

#[derive(Error, Debug)]
pub enum EnclaveError {
    /// A remote call failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A transport could not be built or opened
    #[error("Failed to connect to API container: {0}")]
    Connect(#[from] ConnectError),

    /// Desired topology rejected before sending
    #[error("Invalid network topology: {0}")]
    Partition(#[from] PartitionError),

    /// A caller-supplied argument failed a precondition
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The backend reported success with data that breaks its own contract
    #[error("API container protocol violation: {0}")]
    ProtocolViolation(String),

    /// The caller's container config supplier returned an error
    #[error("Container config supplier for service '{service_id}' failed: {reason}")]
    ContainerConfigSupplier { service_id: String, reason: String },

    /// The engine does not know the enclave
    #[error("No enclave with ID '{0}' found")]
    EnclaveNotFound(String),

    /// The enclave exists but cannot be talked to
    #[error("Enclave '{enclave_id}' is not running: {reason}")]
    EnclaveNotRunning { enclave_id: String, reason: String },

    /// Running engine speaks a different API than this client
    #[error("Engine version {running} does not match the expected {expected}; use the client release that matches the running engine")]
    EngineVersionMismatch { running: String, expected: String },

    /// Packing local files for upload failed
    #[error("Archive error: {0}")]
    Archive(String),

    /// Operation not available with this host's strategies
    #[error("Unsupported on this host: {0}")]
    Unsupported(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EnclaveError {
    /// Get error category for logging and reporting
    pub fn category(&self) -> ErrorCategory {
        match self {
            EnclaveError::Transport(e) if e.is_unreachable() => ErrorCategory::Transport,
            EnclaveError::Transport(e) if e.is_rejection() => ErrorCategory::BackendRejected,
            EnclaveError::Transport(_) => ErrorCategory::ProtocolViolation,
            EnclaveError::Connect(_) => ErrorCategory::Transport,
            EnclaveError::ProtocolViolation(_) => ErrorCategory::ProtocolViolation,
            EnclaveError::EnclaveNotFound(_) | EnclaveError::EnclaveNotRunning { .. } => {
                ErrorCategory::BackendRejected
            }
            EnclaveError::Partition(_)
            | EnclaveError::InvalidArgument(_)
            | EnclaveError::ContainerConfigSupplier { .. } => ErrorCategory::Validation,
            EnclaveError::Archive(_) | EnclaveError::Io(_) => ErrorCategory::Io,
            EnclaveError::Unsupported(_)
            | EnclaveError::Config(_)
            | EnclaveError::EngineVersionMismatch { .. } => ErrorCategory::Configuration,
        }
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::BackendRejected => EXIT_REJECTED,
            ErrorCategory::Validation | ErrorCategory::Configuration => EXIT_INVALID,
            ErrorCategory::Transport => EXIT_UNREACHABLE,
            ErrorCategory::ProtocolViolation => EXIT_PROTOCOL,
            ErrorCategory::Io => EXIT_IO,
        }
    }

    /// Whether the failure happened before anything was sent
    pub fn is_client_side(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Validation | ErrorCategory::Configuration
        )
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Backend unreachable or connection lost
    Transport,
    /// Backend broke its wire contract
    ProtocolViolation,
    /// Caller input rejected before any call
    Validation,
    /// Backend answered with an error
    BackendRejected,
    /// Local file or archive errors
    Io,
    /// Configuration or host capability errors
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Transport => write!(f, "transport"),
            ErrorCategory::ProtocolViolation => write!(f, "protocol"),
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::BackendRejected => write!(f, "rejected"),
            ErrorCategory::Io => write!(f, "io"),
            ErrorCategory::Configuration => write!(f, "configuration"),
        }
    }
}

impl From<toml::de::Error> for EnclaveError {
    fn from(err: toml::de::Error) -> Self {
        EnclaveError::Config(format!("TOML parse error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enclave_core_interface::StatusCode;

    #[test]
    fn test_transport_categories() {
        let unreachable: EnclaveError =
            TransportError::from_status(StatusCode::Unavailable, "down").into();
        assert_eq!(unreachable.category(), ErrorCategory::Transport);
        assert_eq!(unreachable.exit_code(), EXIT_UNREACHABLE);

        let rejected: EnclaveError =
            TransportError::from_status(StatusCode::Unknown, "no such service").into();
        assert_eq!(rejected.category(), ErrorCategory::BackendRejected);
        assert_eq!(rejected.exit_code(), EXIT_REJECTED);

        let empty: EnclaveError = TransportError::EmptyResponse { method: "GetServices" }.into();
        assert_eq!(empty.category(), ErrorCategory::ProtocolViolation);
    }

    #[test]
    fn test_validation_is_client_side() {
        let err: EnclaveError = PartitionError::MissingDefaultConnection.into();
        assert!(err.is_client_side());
        assert_eq!(err.exit_code(), EXIT_INVALID);

        assert!(!EnclaveError::ProtocolViolation("x".into()).is_client_side());
    }

    #[test]
    fn test_transport_display_is_verbatim() {
        let err: EnclaveError =
            TransportError::from_status(StatusCode::AlreadyExists, "Service 'web' exists").into();
        assert_eq!(
            err.to_string(),
            "API container rejected the request (AlreadyExists): Service 'web' exists"
        );
    }

    #[test]
    fn test_supplier_error_display() {
        let err = EnclaveError::ContainerConfigSupplier {
            service_id: "web".to_string(),
            reason: "missing image".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Container config supplier for service 'web' failed: missing image"
        );
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_engine_state_errors() {
        let err = EnclaveError::EnclaveNotFound("e9".to_string());
        assert_eq!(err.to_string(), "No enclave with ID 'e9' found");
        assert_eq!(err.exit_code(), EXIT_REJECTED);
        assert!(!err.is_client_side());

        let err = EnclaveError::EngineVersionMismatch {
            running: "2.0.0".to_string(),
            expected: "1.3.0".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_exit_code_constants() {
        assert_eq!(EXIT_SUCCESS, 0);
        assert_ne!(EXIT_REJECTED, EXIT_UNREACHABLE);
    }
}
