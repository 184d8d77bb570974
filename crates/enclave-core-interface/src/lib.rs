//! Enclave Core Interface: Transport Abstraction
//!
//! This crate defines the `Transport` trait, the single seam between the
//! orchestration client and whatever actually carries RPCs to an enclave's
//! API container.
//!
//! # Architecture
//!
//! - **Transport**: one generic unary call, parameterised by an [`Rpc`] descriptor
//! - **TransportExt**: the adapter every client operation goes through; it turns
//!   a missing response body into an error so callers always get a value
//! - **TransportError**: unreachable vs. rejected vs. protocol violation
//!
//! Concrete transports live in `enclave-connect` (native gRPC and gRPC-Web).
//! A scripted in-memory transport for tests lives in [`testing`].
//!
//! # Example
//!
//! ```rust,no_run
//! use enclave_core_interface::{Transport, TransportExt};
//! use enclave_proto::rpc::GetServices;
//! use enclave_proto::GetServicesArgs;
//!
//! async fn count_services<T: Transport>(transport: &T) -> anyhow::Result<usize> {
//!     let resp = transport
//!         .invoke::<GetServices>(GetServicesArgs::default())
//!         .await?;
//!     Ok(resp.service_info.len())
//! }
//! ```

use async_trait::async_trait;
use enclave_proto::Rpc;
use std::fmt;
use thiserror::Error;
use tracing::debug;

pub mod testing;

/// gRPC status codes, independent of any particular gRPC implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl StatusCode {
    /// Map a numeric gRPC status; values outside the known range become `Unknown`
    pub fn from_i32(code: i32) -> Self {
        match code {
            0 => StatusCode::Ok,
            1 => StatusCode::Cancelled,
            3 => StatusCode::InvalidArgument,
            4 => StatusCode::DeadlineExceeded,
            5 => StatusCode::NotFound,
            6 => StatusCode::AlreadyExists,
            7 => StatusCode::PermissionDenied,
            8 => StatusCode::ResourceExhausted,
            9 => StatusCode::FailedPrecondition,
            10 => StatusCode::Aborted,
            11 => StatusCode::OutOfRange,
            12 => StatusCode::Unimplemented,
            13 => StatusCode::Internal,
            14 => StatusCode::Unavailable,
            15 => StatusCode::DataLoss,
            16 => StatusCode::Unauthenticated,
            _ => StatusCode::Unknown,
        }
    }

    /// Numeric value as sent on the wire
    pub fn as_i32(self) -> i32 {
        match self {
            StatusCode::Ok => 0,
            StatusCode::Cancelled => 1,
            StatusCode::Unknown => 2,
            StatusCode::InvalidArgument => 3,
            StatusCode::DeadlineExceeded => 4,
            StatusCode::NotFound => 5,
            StatusCode::AlreadyExists => 6,
            StatusCode::PermissionDenied => 7,
            StatusCode::ResourceExhausted => 8,
            StatusCode::FailedPrecondition => 9,
            StatusCode::Aborted => 10,
            StatusCode::OutOfRange => 11,
            StatusCode::Unimplemented => 12,
            StatusCode::Internal => 13,
            StatusCode::Unavailable => 14,
            StatusCode::DataLoss => 15,
            StatusCode::Unauthenticated => 16,
        }
    }

    /// Whether this code means the call never reached (or never finished at) the backend
    pub fn is_connectivity(self) -> bool {
        matches!(
            self,
            StatusCode::Unavailable | StatusCode::DeadlineExceeded | StatusCode::Cancelled
        )
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Failure of a single remote call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The backend could not be reached, or the connection broke mid-call
    #[error("API container unreachable: {message}")]
    Unreachable {
        code: Option<StatusCode>,
        message: String,
    },

    /// The backend answered with a non-OK status
    #[error("API container rejected the request ({code}): {message}")]
    Rejected { code: StatusCode, message: String },

    /// The bytes on the wire could not be understood
    #[error("Malformed response from API container: {0}")]
    MalformedResponse(String),

    /// The call succeeded but carried no response message
    #[error("No error was encountered but the response to {method} was still empty")]
    EmptyResponse { method: &'static str },
}

impl TransportError {
    /// Classify a non-OK status reported by the backend or the transport library
    pub fn from_status(code: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        if code.is_connectivity() {
            TransportError::Unreachable {
                code: Some(code),
                message,
            }
        } else {
            TransportError::Rejected { code, message }
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, TransportError::Unreachable { .. })
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, TransportError::Rejected { .. })
    }

    /// The backend broke the wire contract (garbage bytes or a missing body)
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            TransportError::MalformedResponse(_) | TransportError::EmptyResponse { .. }
        )
    }

    /// Status code, when one was received or synthesised
    pub fn code(&self) -> Option<StatusCode> {
        match self {
            TransportError::Unreachable { code, .. } => *code,
            TransportError::Rejected { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Carries unary RPCs to one enclave's API container
///
/// Implementations:
/// - **GrpcTransport**: HTTP/2 gRPC over a tonic channel (native hosts)
/// - **GrpcWebTransport**: gRPC-Web over HTTP/1.1 through a proxy (browser-style hosts)
/// - **MockTransport**: scripted responses for tests
///
/// # Contract
///
/// `call` performs exactly one request. `Ok(None)` means the backend reported
/// success but sent no message; callers should go through
/// [`TransportExt::invoke`], which turns that into
/// [`TransportError::EmptyResponse`].
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to work across async boundaries.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// ID of the enclave this transport talks to
    fn enclave_id(&self) -> &str;

    /// Perform one unary call
    async fn call<M: Rpc>(&self, request: M::Request) -> Result<Option<M::Response>>;
}

/// The request adapter used by every client operation
///
/// Blanket-implemented for all transports.
#[async_trait]
pub trait TransportExt: Transport {
    /// Perform one unary call and require a response message
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged, or
    /// `TransportError::EmptyResponse` when the call succeeded without a body.
    async fn invoke<M: Rpc>(&self, request: M::Request) -> Result<M::Response> {
        debug!("Invoking {} on enclave {}", M::NAME, self.enclave_id());
        match self.call::<M>(request).await {
            Ok(Some(response)) => Ok(response),
            Ok(None) => {
                debug!("{} returned no response message", M::NAME);
                Err(TransportError::EmptyResponse { method: M::NAME })
            }
            Err(e) => {
                debug!("{} failed: {}", M::NAME, e);
                Err(e)
            }
        }
    }
}

impl<T: Transport> TransportExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_round_trip_and_unknown() {
        for n in 0..=16 {
            assert_eq!(StatusCode::from_i32(n).as_i32(), n);
        }
        assert_eq!(StatusCode::from_i32(42), StatusCode::Unknown);
        assert_eq!(StatusCode::from_i32(-1), StatusCode::Unknown);
    }

    #[test]
    fn test_classification() {
        assert!(TransportError::from_status(StatusCode::Unavailable, "down").is_unreachable());
        assert!(TransportError::from_status(StatusCode::DeadlineExceeded, "slow").is_unreachable());
        assert!(TransportError::from_status(StatusCode::Cancelled, "gone").is_unreachable());

        // The backend reports business errors as Unknown
        let err = TransportError::from_status(StatusCode::Unknown, "no such service");
        assert!(err.is_rejection());
        assert_eq!(err.code(), Some(StatusCode::Unknown));

        assert!(TransportError::from_status(StatusCode::NotFound, "x").is_rejection());
    }

    #[test]
    fn test_protocol_violation_predicate() {
        assert!(TransportError::MalformedResponse("bad".into()).is_protocol_violation());
        assert!(TransportError::EmptyResponse { method: "GetServices" }.is_protocol_violation());
        assert!(!TransportError::from_status(StatusCode::Internal, "x").is_protocol_violation());
    }

    #[test]
    fn test_empty_response_message() {
        let err = TransportError::EmptyResponse {
            method: "Repartition",
        };
        assert_eq!(
            err.to_string(),
            "No error was encountered but the response to Repartition was still empty"
        );
    }
}
