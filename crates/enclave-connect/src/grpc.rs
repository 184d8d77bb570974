//! GrpcTransport: native HTTP/2 gRPC transport

use async_trait::async_trait;
use enclave_core_interface::{Result, StatusCode, Transport, TransportError};
use enclave_proto::Rpc;
use tonic::client::Grpc;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic_prost::ProstCodec;
use tracing::{debug, info};

use crate::error::ConnectError;

/// Transport that speaks gRPC directly to the API container.
///
/// This struct is cheaply cloneable (internally uses Arc via tonic's Channel).
///
/// # Example
///
/// ```rust,no_run
/// use enclave_connect::GrpcTransport;
/// use tonic::transport::Channel;
///
/// # async fn example() -> anyhow::Result<()> {
/// let channel = Channel::from_static("http://10.0.0.5:7443").connect().await?;
/// let transport = GrpcTransport::new(channel, "my-enclave");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GrpcTransport {
    /// Generic unary client over the channel
    grpc: Grpc<Channel>,

    enclave_id: String,
}

impl GrpcTransport {
    /// Wrap an already-built channel.
    pub fn new(channel: Channel, enclave_id: impl Into<String>) -> Self {
        Self {
            grpc: Grpc::new(channel),
            enclave_id: enclave_id.into(),
        }
    }

    /// Dial `endpoint` now and fail if the API container is not listening.
    pub async fn connect(
        endpoint: &str,
        enclave_id: impl Into<String>,
    ) -> std::result::Result<Self, ConnectError> {
        let enclave_id = enclave_id.into();
        debug!("Connecting to enclave {} at {}", enclave_id, endpoint);

        let channel = parse_endpoint(endpoint)?.connect().await?;

        info!("Connected to enclave {} at {}", enclave_id, endpoint);
        Ok(Self::new(channel, enclave_id))
    }

    /// Build a transport that dials on first use.
    pub fn connect_lazy(
        endpoint: &str,
        enclave_id: impl Into<String>,
    ) -> std::result::Result<Self, ConnectError> {
        let channel = parse_endpoint(endpoint)?.connect_lazy();
        Ok(Self::new(channel, enclave_id))
    }
}

fn parse_endpoint(endpoint: &str) -> std::result::Result<Endpoint, ConnectError> {
    Endpoint::from_shared(endpoint.to_string()).map_err(|e| ConnectError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

/// Map a tonic status onto the transport error taxonomy
pub(crate) fn classify_status(status: &tonic::Status) -> TransportError {
    TransportError::from_status(
        StatusCode::from_i32(status.code() as i32),
        status.message(),
    )
}

/// What tonic reports when the server sends OK without a response message
const MISSING_RESPONSE_MESSAGE: &str = "Missing response message.";

/// Map a finished unary call, keeping "OK but no message" distinct from a rejection
pub(crate) fn unary_outcome<R>(
    result: std::result::Result<tonic::Response<R>, tonic::Status>,
) -> Result<Option<R>> {
    match result {
        Ok(response) => Ok(Some(response.into_inner())),
        Err(status)
            if status.code() == tonic::Code::Internal
                && status.message() == MISSING_RESPONSE_MESSAGE =>
        {
            Ok(None)
        }
        Err(status) => Err(classify_status(&status)),
    }
}

#[async_trait]
impl Transport for GrpcTransport {
    fn enclave_id(&self) -> &str {
        &self.enclave_id
    }

    async fn call<M: Rpc>(&self, request: M::Request) -> Result<Option<M::Response>> {
        let mut grpc = self.grpc.clone();

        grpc.ready()
            .await
            .map_err(|e| TransportError::Unreachable {
                code: None,
                message: format!("Channel not ready: {}", e),
            })?;

        let codec = ProstCodec::<M::Request, M::Response>::default();
        let result = grpc
            .unary(
                tonic::Request::new(request),
                PathAndQuery::from_static(M::PATH),
                codec,
            )
            .await;

        unary_outcome(result)
    }
}
