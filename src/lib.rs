/*!
 * Enclave - client SDK for an enclave orchestration backend
 *
 * Drives one enclave's API container over gRPC or gRPC-Web:
 * - Service lifecycle (register, start, exec, pause, remove)
 * - Executable modules
 * - Files artifacts (upload, download, store from web or service)
 * - Network partitioning with per-pair packet loss
 *
 * and the engine that creates, stops and destroys enclaves.
 *
 * Version: 0.1.0
 */

pub mod cli_style;
pub mod client;
pub mod config;
pub mod enclave;
pub mod engine;
pub mod error;
pub mod logging;
pub mod modules;
pub mod partition;
pub mod services;

// Re-export commonly used types
pub use client::ApiContainerClient;
pub use config::{ClientConfig, EngineConfig, LogLevel, TopologyConfig};
pub use enclave::{EnclaveContext, HttpAvailabilityCheck, SERVICE_ENCLAVE_DATA_DIR_MOUNTPOINT};
pub use engine::{
    EnclaveConnector, EnclaveId, EngineClient, EngineContext, GrpcConnector, GrpcWebConnector,
    RunningEnclave,
};
pub use error::{EnclaveError, ErrorCategory, Result};
pub use modules::{ModuleContext, ModuleId};
pub use partition::{
    PartitionConnection, PartitionConnections, PartitionId, PartitionServices, ServiceId,
    Topology, DEFAULT_PARTITION_ID,
};
pub use services::{ContainerConfig, ExecResult, PortSpec, ServiceContext, SharedPath};

pub use enclave_connect::{GrpcTransport, GrpcWebTransport};
pub use enclave_core_interface::{Transport, TransportError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
