//! Scripted in-memory transport for tests
//!
//! [`MockTransport`] answers each method path from a queue of canned
//! outcomes and records every request it sees, so tests can assert both on
//! what the client returned and on what it sent (or didn't send).

use crate::{Result, StatusCode, Transport, TransportError};
use async_trait::async_trait;
use enclave_proto::Rpc;
use prost::Message;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// One canned outcome for a method
#[derive(Debug, Clone)]
enum Scripted {
    Body(Vec<u8>),
    NoBody,
    Fail(TransportError),
}

/// A request the mock received
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Method path, e.g. `/api_container_api.ApiContainerService/StartService`
    pub path: &'static str,

    /// Encoded request message
    pub body: Vec<u8>,
}

#[derive(Debug, Default)]
struct MockState {
    scripts: HashMap<&'static str, VecDeque<Scripted>>,
    calls: Vec<RecordedCall>,
}

/// Transport that replays scripted responses
///
/// Outcomes are consumed in the order they were queued for each method. A
/// call with nothing queued fails with `Rejected(Unimplemented)`.
///
/// # Example
///
/// ```rust
/// use enclave_core_interface::testing::MockTransport;
/// use enclave_core_interface::TransportExt;
/// use enclave_proto::rpc::PauseService;
/// use enclave_proto::PauseServiceArgs;
///
/// #[tokio::test]
/// async fn test_pause() {
///     let transport = MockTransport::new("enclave-1");
///     transport.respond::<PauseService>(());
///
///     transport.invoke::<PauseService>(PauseServiceArgs::default()).await.unwrap();
///     assert_eq!(transport.call_count::<PauseService>(), 1);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockTransport {
    enclave_id: String,
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a mock with no scripted responses
    pub fn new(enclave_id: impl Into<String>) -> Self {
        Self {
            enclave_id: enclave_id.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push<M: Rpc>(&self, outcome: Scripted) {
        self.state()
            .scripts
            .entry(M::PATH)
            .or_default()
            .push_back(outcome);
    }

    /// Queue a successful response for `M`
    pub fn respond<M: Rpc>(&self, response: M::Response) {
        self.push::<M>(Scripted::Body(response.encode_to_vec()));
    }

    /// Queue a success that carries no response message
    pub fn respond_empty<M: Rpc>(&self) {
        self.push::<M>(Scripted::NoBody);
    }

    /// Queue a failure for `M`
    pub fn fail<M: Rpc>(&self, error: TransportError) {
        self.push::<M>(Scripted::Fail(error));
    }

    /// Queue a raw body, e.g. bytes that do not decode as `M::Response`
    pub fn respond_raw<M: Rpc>(&self, body: Vec<u8>) {
        self.push::<M>(Scripted::Body(body));
    }

    /// Every call received, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Number of calls received for `M`
    pub fn call_count<M: Rpc>(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.path == M::PATH)
            .count()
    }

    /// Decoded requests received for `M`, in order
    pub fn requests<M: Rpc>(&self) -> Vec<M::Request> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.path == M::PATH)
            .filter_map(|c| M::Request::decode(c.body.as_slice()).ok())
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn enclave_id(&self) -> &str {
        &self.enclave_id
    }

    async fn call<M: Rpc>(&self, request: M::Request) -> Result<Option<M::Response>> {
        let outcome = {
            let mut state = self.state();
            state.calls.push(RecordedCall {
                path: M::PATH,
                body: request.encode_to_vec(),
            });
            state.scripts.get_mut(M::PATH).and_then(VecDeque::pop_front)
        };

        match outcome {
            Some(Scripted::Body(bytes)) => M::Response::decode(bytes.as_slice())
                .map(Some)
                .map_err(|e| TransportError::MalformedResponse(e.to_string())),
            Some(Scripted::NoBody) => Ok(None),
            Some(Scripted::Fail(err)) => Err(err),
            None => Err(TransportError::Rejected {
                code: StatusCode::Unimplemented,
                message: format!("no scripted response for {}", M::PATH),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransportExt;
    use enclave_proto::rpc::{GetServices, PauseService, RegisterService};
    use enclave_proto::{GetServicesArgs, PauseServiceArgs, RegisterServiceArgs, RegisterServiceResponse};

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let transport = MockTransport::new("e1");
        transport.respond::<RegisterService>(RegisterServiceResponse {
            private_ip_addr: "10.0.0.1".into(),
            relative_service_dirpath: "svc-a".into(),
        });
        transport.fail::<RegisterService>(TransportError::from_status(
            StatusCode::AlreadyExists,
            "dup",
        ));

        let args = RegisterServiceArgs {
            service_id: "a".into(),
            partition_id: String::new(),
        };
        let first = transport.invoke::<RegisterService>(args.clone()).await.unwrap();
        assert_eq!(first.private_ip_addr, "10.0.0.1");

        let second = transport.invoke::<RegisterService>(args).await.unwrap_err();
        assert!(second.is_rejection());

        let sent = transport.requests::<RegisterService>();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].service_id, "a");
    }

    #[tokio::test]
    async fn test_empty_body_becomes_error_through_invoke() {
        let transport = MockTransport::new("e1");
        transport.respond_empty::<GetServices>();

        let err = transport
            .invoke::<GetServices>(GetServicesArgs::default())
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::EmptyResponse { method: "GetServices" });
        assert_eq!(transport.call_count::<GetServices>(), 1);
    }

    #[tokio::test]
    async fn test_unscripted_call_is_rejected() {
        let transport = MockTransport::new("e1");
        let err = transport
            .invoke::<PauseService>(PauseServiceArgs::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(StatusCode::Unimplemented));
    }

    #[tokio::test]
    async fn test_garbage_body_is_malformed() {
        let transport = MockTransport::new("e1");
        transport.respond_raw::<GetServices>(vec![0xff, 0xff, 0xff]);

        let err = transport
            .invoke::<GetServices>(GetServicesArgs::default())
            .await
            .unwrap_err();
        assert!(err.is_protocol_violation());
    }
}
