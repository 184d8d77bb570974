/*!
 * Container configuration for a service
 */

use enclave_proto::{Port, StartServiceArgs};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::{EnclaveError, Result};

pub use enclave_proto::port::TransportProtocol;

/// Highest valid port number
pub const MAX_PORT_NUM: u32 = 65535;

/// A port a service listens on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortSpec {
    pub number: u16,
    pub protocol: TransportProtocol,
}

impl PortSpec {
    pub fn new(number: u16, protocol: TransportProtocol) -> Self {
        Self { number, protocol }
    }

    pub fn tcp(number: u16) -> Self {
        Self::new(number, TransportProtocol::Tcp)
    }

    pub fn udp(number: u16) -> Self {
        Self::new(number, TransportProtocol::Udp)
    }

    pub fn to_wire(&self) -> Port {
        Port {
            number: u32::from(self.number),
            transport_protocol: self.protocol as i32,
        }
    }

    /// Interpret a port reported by the backend
    pub fn from_wire(port: &Port) -> Result<Self> {
        if port.number > MAX_PORT_NUM {
            return Err(EnclaveError::ProtocolViolation(format!(
                "Port number {} is above the maximum of {}",
                port.number, MAX_PORT_NUM
            )));
        }
        let protocol = TransportProtocol::try_from(port.transport_protocol).map_err(|_| {
            EnclaveError::ProtocolViolation(format!(
                "Unknown transport protocol {} on port {}",
                port.transport_protocol, port.number
            ))
        })?;
        Ok(Self::new(port.number as u16, protocol))
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.number,
            self.protocol.as_str_name().to_ascii_lowercase()
        )
    }
}

/// Parses `8080`, `8080/tcp`, `53/udp` or `9000/sctp`
impl FromStr for PortSpec {
    type Err = EnclaveError;

    fn from_str(s: &str) -> Result<Self> {
        let (number, protocol) = match s.split_once('/') {
            Some((n, p)) => {
                let protocol = TransportProtocol::from_str_name(&p.to_ascii_uppercase())
                    .ok_or_else(|| {
                        EnclaveError::InvalidArgument(format!("Unknown port protocol '{}'", p))
                    })?;
                (n, protocol)
            }
            None => (s, TransportProtocol::Tcp),
        };
        let number = number.trim().parse::<u16>().map_err(|_| {
            EnclaveError::InvalidArgument(format!("Invalid port number '{}'", number))
        })?;
        Ok(Self::new(number, protocol))
    }
}

/// Convert a backend port map, rejecting invalid entries
pub fn ports_from_wire(ports: &HashMap<String, Port>) -> Result<BTreeMap<String, PortSpec>> {
    let mut converted = BTreeMap::new();
    for (id, port) in ports {
        converted.insert(id.clone(), PortSpec::from_wire(port)?);
    }
    Ok(converted)
}

fn ports_to_wire(ports: &BTreeMap<String, PortSpec>) -> HashMap<String, Port> {
    ports
        .iter()
        .map(|(id, spec)| (id.clone(), spec.to_wire()))
        .collect()
}

/// Everything needed to start a service's container
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerConfig {
    image: String,
    used_ports: BTreeMap<String, PortSpec>,
    public_ports: BTreeMap<String, PortSpec>,
    entrypoint_override_args: Option<Vec<String>>,
    cmd_override_args: Option<Vec<String>>,
    environment_variable_overrides: BTreeMap<String, String>,
    files_artifact_mountpoints: BTreeMap<String, String>,
}

impl ContainerConfig {
    pub fn builder(image: impl Into<String>) -> ContainerConfigBuilder {
        ContainerConfigBuilder::new(image)
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn used_ports(&self) -> &BTreeMap<String, PortSpec> {
        &self.used_ports
    }

    pub fn public_ports(&self) -> &BTreeMap<String, PortSpec> {
        &self.public_ports
    }

    pub fn entrypoint_override_args(&self) -> Option<&[String]> {
        self.entrypoint_override_args.as_deref()
    }

    pub fn cmd_override_args(&self) -> Option<&[String]> {
        self.cmd_override_args.as_deref()
    }

    pub fn environment_variable_overrides(&self) -> &BTreeMap<String, String> {
        &self.environment_variable_overrides
    }

    /// Files artifact UUID -> mount dirpath on the container
    pub fn files_artifact_mountpoints(&self) -> &BTreeMap<String, String> {
        &self.files_artifact_mountpoints
    }

    /// Build the StartService request for `service_id`
    pub fn to_start_service_args(
        &self,
        service_id: &str,
        enclave_data_dir_mnt_dirpath: &str,
    ) -> StartServiceArgs {
        StartServiceArgs {
            service_id: service_id.to_string(),
            docker_image: self.image.clone(),
            private_ports: ports_to_wire(&self.used_ports),
            public_ports: ports_to_wire(&self.public_ports),
            entrypoint_args: self.entrypoint_override_args.clone().unwrap_or_default(),
            cmd_args: self.cmd_override_args.clone().unwrap_or_default(),
            docker_env_vars: self
                .environment_variable_overrides
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            enclave_data_dir_mnt_dirpath: enclave_data_dir_mnt_dirpath.to_string(),
            files_artifact_mountpoints: self
                .files_artifact_mountpoints
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Builder for [`ContainerConfig`]
#[derive(Debug, Clone)]
pub struct ContainerConfigBuilder {
    config: ContainerConfig,
}

impl ContainerConfigBuilder {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            config: ContainerConfig {
                image: image.into(),
                used_ports: BTreeMap::new(),
                public_ports: BTreeMap::new(),
                entrypoint_override_args: None,
                cmd_override_args: None,
                environment_variable_overrides: BTreeMap::new(),
                files_artifact_mountpoints: BTreeMap::new(),
            },
        }
    }

    pub fn with_used_port(mut self, port_id: impl Into<String>, spec: PortSpec) -> Self {
        self.config.used_ports.insert(port_id.into(), spec);
        self
    }

    pub fn with_used_ports(mut self, ports: BTreeMap<String, PortSpec>) -> Self {
        self.config.used_ports = ports;
        self
    }

    /// Request a fixed host port for a used port
    pub fn with_public_port(mut self, port_id: impl Into<String>, spec: PortSpec) -> Self {
        self.config.public_ports.insert(port_id.into(), spec);
        self
    }

    pub fn with_entrypoint_override(mut self, args: Vec<String>) -> Self {
        self.config.entrypoint_override_args = Some(args);
        self
    }

    pub fn with_cmd_override(mut self, args: Vec<String>) -> Self {
        self.config.cmd_override_args = Some(args);
        self
    }

    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config
            .environment_variable_overrides
            .insert(key.into(), value.into());
        self
    }

    pub fn with_env_vars(mut self, vars: BTreeMap<String, String>) -> Self {
        self.config.environment_variable_overrides = vars;
        self
    }

    pub fn with_files_artifact(
        mut self,
        artifact_uuid: impl Into<String>,
        mount_dirpath: impl Into<String>,
    ) -> Self {
        self.config
            .files_artifact_mountpoints
            .insert(artifact_uuid.into(), mount_dirpath.into());
        self
    }

    pub fn build(self) -> ContainerConfig {
        self.config
    }
}
