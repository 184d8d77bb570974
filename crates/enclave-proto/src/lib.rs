//! Wire protocol definitions for the enclave API container and engine services.
//!
//! The message structs mirror the backend's protobuf schema and are encoded
//! with prost. Every remote operation also gets a zero-sized descriptor in
//! [`rpc`] that pins its request type, response type and method path, so a
//! transport can dispatch any operation through one generic call.

pub mod api_container {
    pub mod v1;
}

/// Engine service messages. Not glob re-exported; use `engine_api::v1`.
pub mod engine_api {
    pub mod v1;
}

pub mod rpc;

// Re-export commonly used types for convenience
pub use api_container::v1::*;
pub use rpc::Rpc;
