/*!
 * Handle to one registered service
 */

use enclave_core_interface::Transport;
use enclave_proto::ExecCommandArgs;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::PortSpec;
use crate::client::ApiContainerClient;
use crate::enclave::path_joiner::{posix_join, PathJoiner};
use crate::error::Result;
use crate::partition::ServiceId;

/// A directory visible both on this host and inside a service's container
#[derive(Clone)]
pub struct SharedPath {
    abs_path_on_this_host: String,
    abs_path_on_service_container: String,
    joiner: Arc<dyn PathJoiner>,
}

impl SharedPath {
    pub(crate) fn new(
        abs_path_on_this_host: String,
        abs_path_on_service_container: String,
        joiner: Arc<dyn PathJoiner>,
    ) -> Self {
        Self {
            abs_path_on_this_host,
            abs_path_on_service_container,
            joiner,
        }
    }

    pub fn abs_path_on_this_host(&self) -> &str {
        &self.abs_path_on_this_host
    }

    pub fn abs_path_on_service_container(&self) -> &str {
        &self.abs_path_on_service_container
    }

    /// The same child path on both sides
    pub fn child(&self, relative: &str) -> SharedPath {
        SharedPath {
            abs_path_on_this_host: self.joiner.join(&self.abs_path_on_this_host, relative),
            abs_path_on_service_container: posix_join(
                &self.abs_path_on_service_container,
                relative,
            ),
            joiner: Arc::clone(&self.joiner),
        }
    }
}

impl fmt::Debug for SharedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPath")
            .field("abs_path_on_this_host", &self.abs_path_on_this_host)
            .field(
                "abs_path_on_service_container",
                &self.abs_path_on_service_container,
            )
            .finish()
    }
}

impl PartialEq for SharedPath {
    fn eq(&self, other: &Self) -> bool {
        self.abs_path_on_this_host == other.abs_path_on_this_host
            && self.abs_path_on_service_container == other.abs_path_on_service_container
    }
}

/// Outcome of a command run inside a service container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    pub exit_code: i32,

    /// Combined stdout and stderr
    pub logs: String,
}

/// Handle to one service in an enclave
pub struct ServiceContext<T: Transport> {
    client: Arc<ApiContainerClient<T>>,
    service_id: ServiceId,
    private_ip: String,
    private_ports: BTreeMap<String, PortSpec>,
    maybe_public_ip: Option<String>,
    maybe_public_ports: BTreeMap<String, PortSpec>,
    shared_directory: SharedPath,
}

impl<T: Transport> ServiceContext<T> {
    pub(crate) fn new(
        client: Arc<ApiContainerClient<T>>,
        service_id: ServiceId,
        private_ip: String,
        private_ports: BTreeMap<String, PortSpec>,
        maybe_public_ip: Option<String>,
        maybe_public_ports: BTreeMap<String, PortSpec>,
        shared_directory: SharedPath,
    ) -> Self {
        Self {
            client,
            service_id,
            private_ip,
            private_ports,
            maybe_public_ip,
            maybe_public_ports,
            shared_directory,
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Address other services in the enclave reach this one on
    pub fn private_ip(&self) -> &str {
        &self.private_ip
    }

    pub fn private_ports(&self) -> &BTreeMap<String, PortSpec> {
        &self.private_ports
    }

    /// Host-reachable address, when the service exposes public ports
    pub fn maybe_public_ip(&self) -> Option<&str> {
        self.maybe_public_ip.as_deref()
    }

    pub fn maybe_public_ports(&self) -> &BTreeMap<String, PortSpec> {
        &self.maybe_public_ports
    }

    pub fn shared_directory(&self) -> &SharedPath {
        &self.shared_directory
    }

    /// Run `argv` inside the container and wait for it to exit
    pub async fn exec_command(&self, argv: Vec<String>) -> Result<ExecResult> {
        debug!("Executing {:?} in service '{}'", argv, self.service_id);
        let resp = self
            .client
            .exec_command(ExecCommandArgs {
                service_id: self.service_id.clone(),
                command_args: argv,
            })
            .await?;

        Ok(ExecResult {
            exit_code: resp.exit_code,
            logs: resp.log_output,
        })
    }
}

impl<T: Transport> fmt::Debug for ServiceContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContext")
            .field("service_id", &self.service_id)
            .field("private_ip", &self.private_ip)
            .field("private_ports", &self.private_ports)
            .field("maybe_public_ip", &self.maybe_public_ip)
            .field("maybe_public_ports", &self.maybe_public_ports)
            .field("shared_directory", &self.shared_directory)
            .finish()
    }
}
