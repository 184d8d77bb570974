//! Integration tests for enclave-connect
//!
//! The gRPC-Web tests run against a one-shot HTTP/1.1 responder on
//! localhost. Tests that need a live API container are marked `#[ignore]`.

use enclave_connect::{GrpcTransport, GrpcWebTransport};
use enclave_core_interface::{StatusCode, Transport, TransportError, TransportExt};
use enclave_proto::rpc::{ExecCommand, GetServices, PauseService};
use enclave_proto::{ExecCommandArgs, ExecCommandResponse, GetServicesArgs, PauseServiceArgs};
use prost::Message;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

fn frame(flag: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![flag];
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Serve exactly one request, answering with `head` + `body`, and hand back the raw request
async fn serve_once(head: String, body: Vec<u8>) -> (String, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        let header_end = loop {
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            request.extend_from_slice(&buf[..n]);
            if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let headers = String::from_utf8_lossy(&request[..header_end]).to_ascii_lowercase();
        let content_length = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .map(|v| v.trim().parse::<usize>().unwrap())
            .unwrap_or(0);
        while request.len() < header_end + content_length {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let mut response = format!(
            "{}content-length: {}\r\nconnection: close\r\n\r\n",
            head,
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(&body);
        socket.write_all(&response).await.unwrap();
        socket.shutdown().await.unwrap();

        request
    });

    (format!("http://{}", addr), handle)
}

const OK_HEAD: &str = "HTTP/1.1 200 OK\r\ncontent-type: application/grpc-web+proto\r\n";

#[tokio::test]
async fn test_grpc_web_success_round_trip() {
    let reply = ExecCommandResponse {
        exit_code: 3,
        log_output: "boom\n".to_string(),
    };
    let mut body = frame(0x00, &reply.encode_to_vec());
    body.extend(frame(0x80, b"grpc-status: 0\r\n"));

    let (url, server) = serve_once(OK_HEAD.to_string(), body).await;
    let transport = GrpcWebTransport::new(&url, "e1").unwrap();

    let resp = transport
        .invoke::<ExecCommand>(ExecCommandArgs {
            service_id: "web".to_string(),
            command_args: vec!["false".to_string()],
        })
        .await
        .unwrap();
    assert_eq!(resp.exit_code, 3);
    assert_eq!(resp.log_output, "boom\n");

    let raw = server.await.unwrap();
    let text = String::from_utf8_lossy(&raw);
    assert!(text.starts_with("POST /api_container_api.ApiContainerService/ExecCommand HTTP/1.1"));
    assert!(text.to_ascii_lowercase().contains("x-grpc-web: 1"));
}

#[tokio::test]
async fn test_grpc_web_trailer_error_is_rejection() {
    let body = frame(0x80, b"grpc-status: 2\r\ngrpc-message: No%20such%20service\r\n");
    let (url, _server) = serve_once(OK_HEAD.to_string(), body).await;
    let transport = GrpcWebTransport::new(&url, "e1").unwrap();

    let err = transport
        .invoke::<PauseService>(PauseServiceArgs {
            service_id: "ghost".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(
        err,
        TransportError::Rejected {
            code: StatusCode::Unknown,
            message: "No such service".to_string(),
        }
    );
}

#[tokio::test]
async fn test_grpc_web_ok_without_message_is_empty_response() {
    let head = format!("{}grpc-status: 0\r\n", OK_HEAD);
    let (url, _server) = serve_once(head, Vec::new()).await;
    let transport = GrpcWebTransport::new(&url, "e1").unwrap();

    let raw = transport
        .call::<GetServices>(GetServicesArgs::default())
        .await
        .unwrap();
    assert!(raw.is_none());
}

#[tokio::test]
async fn test_grpc_web_http_error_is_unreachable() {
    let (url, _server) = serve_once("HTTP/1.1 502 Bad Gateway\r\n".to_string(), Vec::new()).await;
    let transport = GrpcWebTransport::new(&url, "e1").unwrap();

    let err = transport
        .invoke::<GetServices>(GetServicesArgs::default())
        .await
        .unwrap_err();
    assert!(err.is_unreachable());
}

#[tokio::test]
async fn test_grpc_web_refused_connection_is_unreachable() {
    // Bind then drop to get a port nothing listens on
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let transport = GrpcWebTransport::new(&format!("http://127.0.0.1:{}", port), "e1").unwrap();

    let err = transport
        .invoke::<GetServices>(GetServicesArgs::default())
        .await
        .unwrap_err();
    assert!(err.is_unreachable());
}

#[tokio::test]
async fn test_grpc_lazy_transport_fails_without_server() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let transport =
        GrpcTransport::connect_lazy(&format!("http://127.0.0.1:{}", port), "e1").unwrap();

    let result = transport
        .invoke::<GetServices>(GetServicesArgs::default())
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_grpc_eager_connect_fails_without_server() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let result = GrpcTransport::connect(&format!("http://127.0.0.1:{}", port), "e1").await;
    assert!(result.is_err());
}

#[tokio::test]
#[ignore] // Requires a running API container on localhost:7443
async fn test_grpc_live_get_services() {
    let transport = GrpcTransport::connect("http://127.0.0.1:7443", "live")
        .await
        .unwrap();
    let resp = transport
        .invoke::<GetServices>(GetServicesArgs::default())
        .await
        .unwrap();
    println!("{} services", resp.service_info.len());
}
