//! GrpcWebTransport: gRPC-Web over HTTP/1.1
//!
//! Used where the host can only make ordinary HTTP requests. Each call is a
//! single POST to a gRPC-Web proxy sitting in front of the API container.

pub mod frame;

use async_trait::async_trait;
use enclave_core_interface::{Result, Transport, TransportError};
use enclave_proto::Rpc;
use prost::Message;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use tracing::debug;

use crate::error::ConnectError;
use frame::GrpcStatus;

const GRPC_WEB_CONTENT_TYPE: &str = "application/grpc-web+proto";

/// Transport that speaks gRPC-Web through a proxy.
///
/// Cheap to clone; `reqwest::Client` pools connections internally.
///
/// # Example
///
/// ```rust,no_run
/// use enclave_connect::GrpcWebTransport;
///
/// # fn example() -> anyhow::Result<()> {
/// let transport = GrpcWebTransport::new("http://localhost:8080", "my-enclave")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct GrpcWebTransport {
    client: reqwest::Client,

    /// Proxy base URL without a trailing slash
    base_url: String,

    enclave_id: String,
}

impl GrpcWebTransport {
    /// Create a transport with a default HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `ConnectError::InvalidEndpoint` unless `proxy_url` is an
    /// `http://` or `https://` URL.
    pub fn new(
        proxy_url: &str,
        enclave_id: impl Into<String>,
    ) -> std::result::Result<Self, ConnectError> {
        let client = reqwest::Client::builder().build()?;
        Self::with_client(client, proxy_url, enclave_id)
    }

    /// Create a transport around a caller-configured HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        proxy_url: &str,
        enclave_id: impl Into<String>,
    ) -> std::result::Result<Self, ConnectError> {
        if !(proxy_url.starts_with("http://") || proxy_url.starts_with("https://")) {
            return Err(ConnectError::InvalidEndpoint {
                endpoint: proxy_url.to_string(),
                reason: "expected an http:// or https:// URL".to_string(),
            });
        }

        Ok(Self {
            client,
            base_url: proxy_url.trim_end_matches('/').to_string(),
            enclave_id: enclave_id.into(),
        })
    }

    /// Proxy URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn header_status(headers: &HeaderMap) -> Result<Option<GrpcStatus>> {
    let Some(code) = headers.get("grpc-status") else {
        return Ok(None);
    };
    let code = code.to_str().map_err(|_| {
        TransportError::MalformedResponse("grpc-status header is not ASCII".to_string())
    })?;
    let message = headers.get("grpc-message").and_then(|v| v.to_str().ok());
    GrpcStatus::parse(code, message).map(Some)
}

fn unreachable(err: reqwest::Error) -> TransportError {
    TransportError::Unreachable {
        code: None,
        message: err.to_string(),
    }
}

#[async_trait]
impl Transport for GrpcWebTransport {
    fn enclave_id(&self) -> &str {
        &self.enclave_id
    }

    async fn call<M: Rpc>(&self, request: M::Request) -> Result<Option<M::Response>> {
        let url = format!("{}{}", self.base_url, M::PATH);
        let body = frame::encode_frame(&request.encode_to_vec());

        debug!("POST {} ({} bytes)", url, body.len());

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, GRPC_WEB_CONTENT_TYPE)
            .header(ACCEPT, GRPC_WEB_CONTENT_TYPE)
            .header("x-grpc-web", "1")
            .body(body)
            .send()
            .await
            .map_err(unreachable)?;

        let http_status = response.status();
        if !http_status.is_success() {
            return Err(TransportError::Unreachable {
                code: None,
                message: format!("gRPC-Web proxy answered HTTP {}", http_status),
            });
        }

        let from_headers = header_status(response.headers())?;
        let bytes = response.bytes().await.map_err(unreachable)?;

        match frame::decode_response(from_headers, &bytes)? {
            Some(payload) => M::Response::decode(payload.as_slice())
                .map(Some)
                .map_err(|e| TransportError::MalformedResponse(e.to_string())),
            None => Ok(None),
        }
    }
}
