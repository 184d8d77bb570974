//! Enclave Connect: Client-side transports for the enclave API container
//!
//! This crate provides the two concrete [`Transport`] implementations the
//! orchestration client can run on.
//!
//! # Architecture
//!
//! - **GrpcTransport**: HTTP/2 gRPC over a tonic `Channel`, for native hosts
//! - **GrpcWebTransport**: gRPC-Web frames over HTTP/1.1 through a proxy, for
//!   hosts that can only speak plain HTTP requests
//!
//! Both map failures onto the same [`TransportError`] taxonomy, so code above
//! the transport never needs to know which one it is running on.
//!
//! # Example
//!
//! ```rust,no_run
//! use enclave_connect::GrpcTransport;
//! use enclave_core_interface::TransportExt;
//! use enclave_proto::rpc::GetModules;
//! use enclave_proto::GetModulesArgs;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let transport = GrpcTransport::connect("http://127.0.0.1:7443", "my-enclave").await?;
//!     let modules = transport.invoke::<GetModules>(GetModulesArgs::default()).await?;
//!     println!("{} modules loaded", modules.module_info.len());
//!     Ok(())
//! }
//! ```
//!
//! [`Transport`]: enclave_core_interface::Transport
//! [`TransportError`]: enclave_core_interface::TransportError

pub mod error;
pub mod grpc;
pub mod grpc_web;

pub use error::ConnectError;
pub use grpc::GrpcTransport;
pub use grpc_web::GrpcWebTransport;
