/*!
 * Services: container configuration and per-service handles
 */

mod container_config;
mod service_context;

pub use container_config::{
    ports_from_wire, ContainerConfig, ContainerConfigBuilder, PortSpec, TransportProtocol,
    MAX_PORT_NUM,
};
pub use service_context::{ExecResult, ServiceContext, SharedPath};

pub use crate::partition::ServiceId;
