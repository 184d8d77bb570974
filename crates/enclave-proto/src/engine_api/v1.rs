//! Messages for `engine_api.EngineService`.
//!
//! Field tags are owned by the engine; do not renumber.

use std::collections::HashMap;

// ==============================================================================================
//                                        Engine Info
// ==============================================================================================
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetEngineInfoResponse {
    /// Version of the running engine, normally X.Y.Z
    #[prost(string, tag = "1")]
    pub engine_version: String,
}

// ==============================================================================================
//                                       Create Enclave
// ==============================================================================================
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateEnclaveArgs {
    #[prost(string, tag = "1")]
    pub enclave_id: String,
    /// Blank means the engine's default API container image
    #[prost(string, tag = "2")]
    pub api_container_version_tag: String,
    #[prost(string, tag = "3")]
    pub api_container_log_level: String,
    #[prost(bool, tag = "4")]
    pub is_partitioning_enabled: bool,
    #[prost(bool, tag = "5")]
    pub should_publish_all_ports: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateEnclaveResponse {
    #[prost(message, optional, tag = "1")]
    pub enclave_info: Option<EnclaveInfo>,
}

// ==============================================================================================
//                                      Enclave Info
// ==============================================================================================
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum EnclaveContainersStatus {
    /// The enclave has no containers
    Empty = 0,
    /// At least one container is running
    Running = 1,
    /// Containers exist but none is running
    Stopped = 2,
}

impl EnclaveContainersStatus {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            EnclaveContainersStatus::Empty => "EnclaveContainersStatus_EMPTY",
            EnclaveContainersStatus::Running => "EnclaveContainersStatus_RUNNING",
            EnclaveContainersStatus::Stopped => "EnclaveContainersStatus_STOPPED",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum EnclaveApiContainerStatus {
    Nonexistent = 0,
    Running = 1,
    Stopped = 2,
}

impl EnclaveApiContainerStatus {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            EnclaveApiContainerStatus::Nonexistent => "EnclaveAPIContainerStatus_NONEXISTENT",
            EnclaveApiContainerStatus::Running => "EnclaveAPIContainerStatus_RUNNING",
            EnclaveApiContainerStatus::Stopped => "EnclaveAPIContainerStatus_STOPPED",
        }
    }
}

/// Where the API container lives inside the enclave network
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EnclaveApiContainerInfo {
    #[prost(string, tag = "1")]
    pub container_id: String,
    #[prost(string, tag = "2")]
    pub ip_inside_enclave: String,
    #[prost(uint32, tag = "3")]
    pub grpc_port_inside_enclave: u32,
    #[prost(uint32, tag = "4")]
    pub grpc_proxy_port_inside_enclave: u32,
}

/// How to reach the API container from the engine's host machine
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EnclaveApiContainerHostMachineInfo {
    #[prost(string, tag = "1")]
    pub ip_on_host_machine: String,
    #[prost(uint32, tag = "2")]
    pub grpc_port_on_host_machine: u32,
    #[prost(uint32, tag = "3")]
    pub grpc_proxy_port_on_host_machine: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EnclaveInfo {
    #[prost(string, tag = "1")]
    pub enclave_id: String,
    #[prost(string, tag = "2")]
    pub network_id: String,
    #[prost(string, tag = "3")]
    pub network_cidr: String,
    #[prost(enumeration = "EnclaveContainersStatus", tag = "4")]
    pub containers_status: i32,
    #[prost(enumeration = "EnclaveApiContainerStatus", tag = "5")]
    pub api_container_status: i32,
    /// Only set if the API container exists
    #[prost(message, optional, tag = "6")]
    pub api_container_info: Option<EnclaveApiContainerInfo>,
    /// Only set if the API container is running
    #[prost(message, optional, tag = "7")]
    pub api_container_host_machine_info: Option<EnclaveApiContainerHostMachineInfo>,
    #[prost(string, tag = "8")]
    pub enclave_data_dirpath_on_host_machine: String,
}

// ==============================================================================================
//                                       Get Enclaves
// ==============================================================================================
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetEnclavesResponse {
    /// Enclave ID -> info
    #[prost(map = "string, message", tag = "1")]
    pub enclave_info: HashMap<String, EnclaveInfo>,
}

// ==============================================================================================
//                                   Stop / Destroy / Clean
// ==============================================================================================
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StopEnclaveArgs {
    #[prost(string, tag = "1")]
    pub enclave_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DestroyEnclaveArgs {
    #[prost(string, tag = "1")]
    pub enclave_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CleanArgs {
    /// Also remove running enclaves, not just stopped ones
    #[prost(bool, tag = "1")]
    pub should_clean_all: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CleanResponse {
    /// Set of enclave IDs that were removed
    #[prost(map = "string, bool", tag = "1")]
    pub removed_enclave_ids: HashMap<String, bool>,
}
