//! Messages for `api_container_api.ApiContainerService`.
//!
//! Field tags are owned by the backend; do not renumber.

use std::collections::HashMap;

// ==============================================================================================
//                           Shared Objects (Used By Multiple Endpoints)
// ==============================================================================================
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Port {
    #[prost(uint32, tag = "1")]
    pub number: u32,
    #[prost(enumeration = "port::TransportProtocol", tag = "2")]
    pub transport_protocol: i32,
}

/// Nested message and enum types in `Port`.
pub mod port {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum TransportProtocol {
        Tcp = 0,
        Sctp = 1,
        Udp = 2,
    }

    impl TransportProtocol {
        /// String value of the enum field names used in the protobuf definition.
        pub fn as_str_name(&self) -> &'static str {
            match self {
                TransportProtocol::Tcp => "TCP",
                TransportProtocol::Sctp => "SCTP",
                TransportProtocol::Udp => "UDP",
            }
        }

        /// Creates an enum from field names used in the protobuf definition.
        pub fn from_str_name(value: &str) -> Option<Self> {
            match value {
                "TCP" => Some(Self::Tcp),
                "SCTP" => Some(Self::Sctp),
                "UDP" => Some(Self::Udp),
                _ => None,
            }
        }
    }
}

// ==============================================================================================
//                                           Modules
// ==============================================================================================
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LoadModuleArgs {
    #[prost(string, tag = "1")]
    pub module_id: String,
    #[prost(string, tag = "2")]
    pub container_image: String,
    #[prost(string, tag = "3")]
    pub serialized_params: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UnloadModuleArgs {
    #[prost(string, tag = "1")]
    pub module_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UnloadModuleResponse {
    #[prost(string, tag = "1")]
    pub module_guid: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetModulesArgs {
    /// Module IDs to fetch; empty means "all modules"
    #[prost(map = "string, bool", tag = "1")]
    pub ids: HashMap<String, bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ModuleInfo {
    #[prost(string, tag = "1")]
    pub guid: String,
    #[prost(string, tag = "2")]
    pub private_ip_addr: String,
    #[prost(message, optional, tag = "3")]
    pub private_grpc_port: Option<Port>,
    #[prost(string, tag = "4")]
    pub maybe_public_ip_addr: String,
    #[prost(message, optional, tag = "5")]
    pub maybe_public_grpc_port: Option<Port>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetModulesResponse {
    #[prost(map = "string, message", tag = "1")]
    pub module_info: HashMap<String, ModuleInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecuteModuleArgs {
    #[prost(string, tag = "1")]
    pub module_id: String,
    #[prost(string, tag = "2")]
    pub serialized_params: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecuteModuleResponse {
    #[prost(string, tag = "1")]
    pub serialized_result: String,
}

// ==============================================================================================
//                                      Service Lifecycle
// ==============================================================================================
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterServiceArgs {
    #[prost(string, tag = "1")]
    pub service_id: String,
    /// Empty string means the default partition
    #[prost(string, tag = "2")]
    pub partition_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterServiceResponse {
    #[prost(string, tag = "1")]
    pub private_ip_addr: String,
    /// Service directory, relative to the root of the enclave data dir
    #[prost(string, tag = "2")]
    pub relative_service_dirpath: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StartServiceArgs {
    #[prost(string, tag = "1")]
    pub service_id: String,
    #[prost(string, tag = "2")]
    pub docker_image: String,
    #[prost(map = "string, message", tag = "3")]
    pub private_ports: HashMap<String, Port>,
    #[prost(map = "string, message", tag = "4")]
    pub public_ports: HashMap<String, Port>,
    #[prost(string, repeated, tag = "5")]
    pub entrypoint_args: Vec<String>,
    #[prost(string, repeated, tag = "6")]
    pub cmd_args: Vec<String>,
    #[prost(map = "string, string", tag = "7")]
    pub docker_env_vars: HashMap<String, String>,
    #[prost(string, tag = "8")]
    pub enclave_data_dir_mnt_dirpath: String,
    /// Files artifact UUID -> mount dirpath on the service container
    #[prost(map = "string, string", tag = "9")]
    pub files_artifact_mountpoints: HashMap<String, String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StartServiceResponse {
    /// Empty if the service declared no public ports or the backend can't report them
    #[prost(string, tag = "1")]
    pub maybe_public_ip_addr: String,
    #[prost(map = "string, message", tag = "2")]
    pub maybe_public_ports: HashMap<String, Port>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetServicesArgs {
    /// Service IDs to fetch; empty means "all services"
    #[prost(map = "string, bool", tag = "1")]
    pub service_ids: HashMap<String, bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServiceInfo {
    #[prost(string, tag = "1")]
    pub service_guid: String,
    #[prost(string, tag = "2")]
    pub private_ip_addr: String,
    #[prost(map = "string, message", tag = "3")]
    pub private_ports: HashMap<String, Port>,
    #[prost(string, tag = "4")]
    pub maybe_public_ip_addr: String,
    #[prost(map = "string, message", tag = "5")]
    pub maybe_public_ports: HashMap<String, Port>,
    #[prost(string, tag = "6")]
    pub relative_service_dirpath: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetServicesResponse {
    #[prost(map = "string, message", tag = "1")]
    pub service_info: HashMap<String, ServiceInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RemoveServiceArgs {
    #[prost(string, tag = "1")]
    pub service_id: String,
    #[prost(uint64, tag = "2")]
    pub container_stop_timeout_seconds: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RemoveServiceResponse {
    #[prost(string, tag = "1")]
    pub service_guid: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PauseServiceArgs {
    #[prost(string, tag = "1")]
    pub service_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UnpauseServiceArgs {
    #[prost(string, tag = "1")]
    pub service_id: String,
}

// ==============================================================================================
//                                         Repartition
// ==============================================================================================
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RepartitionArgs {
    /// Partition ID -> services in that partition
    #[prost(map = "string, message", tag = "1")]
    pub partition_services: HashMap<String, PartitionServices>,
    /// Partition A -> (Partition B -> connection between A and B)
    #[prost(map = "string, message", tag = "2")]
    pub partition_connections: HashMap<String, PartitionConnections>,
    #[prost(message, optional, tag = "3")]
    pub default_connection: Option<PartitionConnectionInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PartitionServices {
    /// Set of service IDs; the bool is always true
    #[prost(map = "string, bool", tag = "1")]
    pub service_id_set: HashMap<String, bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PartitionConnections {
    #[prost(map = "string, message", tag = "1")]
    pub connection_info: HashMap<String, PartitionConnectionInfo>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct PartitionConnectionInfo {
    #[prost(float, tag = "1")]
    pub packet_loss_percentage: f32,
}

// ==============================================================================================
//                                        Exec Command
// ==============================================================================================
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecCommandArgs {
    #[prost(string, tag = "1")]
    pub service_id: String,
    #[prost(string, repeated, tag = "2")]
    pub command_args: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecCommandResponse {
    #[prost(int32, tag = "1")]
    pub exit_code: i32,
    /// Combined stdout and stderr of the command
    #[prost(string, tag = "2")]
    pub log_output: String,
}

// ==============================================================================================
//                              Wait For Http Endpoint Availability
// ==============================================================================================
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WaitForHttpGetEndpointAvailabilityArgs {
    #[prost(string, tag = "1")]
    pub service_id: String,
    #[prost(uint32, tag = "2")]
    pub port: u32,
    #[prost(string, tag = "3")]
    pub path: String,
    #[prost(uint32, tag = "4")]
    pub initial_delay_milliseconds: u32,
    #[prost(uint32, tag = "5")]
    pub retries: u32,
    #[prost(uint32, tag = "6")]
    pub retries_delay_milliseconds: u32,
    /// Substring the response body must contain; empty disables the check
    #[prost(string, tag = "7")]
    pub body_text: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WaitForHttpPostEndpointAvailabilityArgs {
    #[prost(string, tag = "1")]
    pub service_id: String,
    #[prost(uint32, tag = "2")]
    pub port: u32,
    #[prost(string, tag = "3")]
    pub path: String,
    #[prost(string, tag = "4")]
    pub request_body: String,
    #[prost(uint32, tag = "5")]
    pub initial_delay_milliseconds: u32,
    #[prost(uint32, tag = "6")]
    pub retries: u32,
    #[prost(uint32, tag = "7")]
    pub retries_delay_milliseconds: u32,
    #[prost(string, tag = "8")]
    pub body_text: String,
}

// ==============================================================================================
//                                       Files Artifacts
// ==============================================================================================
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UploadFilesArtifactArgs {
    /// gzipped tarball contents
    #[prost(bytes = "vec", tag = "1")]
    pub data: Vec<u8>,
    #[prost(string, tag = "2")]
    pub name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UploadFilesArtifactResponse {
    #[prost(string, tag = "1")]
    pub uuid: String,
    #[prost(string, tag = "2")]
    pub name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DownloadFilesArtifactArgs {
    /// Artifact UUID or name
    #[prost(string, tag = "1")]
    pub identifier: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DownloadFilesArtifactResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub data: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StoreWebFilesArtifactArgs {
    #[prost(string, tag = "1")]
    pub url: String,
    #[prost(string, tag = "2")]
    pub name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StoreWebFilesArtifactResponse {
    #[prost(string, tag = "1")]
    pub uuid: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StoreFilesArtifactFromServiceArgs {
    #[prost(string, tag = "1")]
    pub service_id: String,
    #[prost(string, tag = "2")]
    pub source_path: String,
    #[prost(string, tag = "3")]
    pub name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StoreFilesArtifactFromServiceResponse {
    #[prost(string, tag = "1")]
    pub uuid: String,
}
