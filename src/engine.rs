/*!
 * Engine context: creates, lists and tears down enclaves
 *
 * The engine owns enclave lifecycles. An [`EngineContext`] talks to it over
 * any [`Transport`] and hands out [`EnclaveContext`]s for running enclaves
 * through an [`EnclaveConnector`], which decides how this host reaches an
 * enclave's API container.
 */

use enclave_connect::{GrpcTransport, GrpcWebTransport};
use enclave_core_interface::{Transport, TransportExt};
use enclave_proto::engine_api::v1::{
    CleanArgs, CleanResponse, CreateEnclaveArgs, CreateEnclaveResponse, DestroyEnclaveArgs,
    EnclaveApiContainerStatus, EnclaveContainersStatus, EnclaveInfo, GetEnclavesResponse,
    GetEngineInfoResponse, StopEnclaveArgs,
};
use enclave_proto::rpc::engine;
use semver::Version;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::enclave::{
    EnclaveContext, FsTgzArchiver, NativePathJoiner, PosixPathJoiner, UnsupportedArchiver,
};
use crate::error::{EnclaveError, Result};

/// Engine API version this client is built against
pub const ENGINE_API_VERSION: &str = "1.0.0";

pub const DEFAULT_ENGINE_GRPC_PORT: u16 = 9710;
pub const DEFAULT_ENGINE_GRPC_PROXY_PORT: u16 = 9711;

// Blank tells the engine to use its default API container image
const DEFAULT_API_CONTAINER_VERSION_TAG: &str = "";
const API_CONTAINER_LOG_LEVEL: &str = "debug";
const SHOULD_PUBLISH_ALL_PORTS: bool = true;

pub type EnclaveId = String;

// ============================================================================
// Engine client
// ============================================================================

/// Typed facade over a [`Transport`] bound to the engine
#[derive(Debug, Clone)]
pub struct EngineClient<T> {
    transport: T,
}

impl<T: Transport> EngineClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn get_engine_info(&self) -> Result<GetEngineInfoResponse> {
        Ok(self.transport.invoke::<engine::GetEngineInfo>(()).await?)
    }

    pub async fn create_enclave(&self, args: CreateEnclaveArgs) -> Result<CreateEnclaveResponse> {
        Ok(self.transport.invoke::<engine::CreateEnclave>(args).await?)
    }

    pub async fn get_enclaves(&self) -> Result<GetEnclavesResponse> {
        Ok(self.transport.invoke::<engine::GetEnclaves>(()).await?)
    }

    pub async fn stop_enclave(&self, args: StopEnclaveArgs) -> Result<()> {
        Ok(self.transport.invoke::<engine::StopEnclave>(args).await?)
    }

    pub async fn destroy_enclave(&self, args: DestroyEnclaveArgs) -> Result<()> {
        Ok(self.transport.invoke::<engine::DestroyEnclave>(args).await?)
    }

    pub async fn clean(&self, args: CleanArgs) -> Result<CleanResponse> {
        Ok(self.transport.invoke::<engine::Clean>(args).await?)
    }
}

/// Fail if the running engine's major.minor differs from the expected one
///
/// Versions that do not parse as X.Y.Z cannot be compared; that is logged
/// and let through.
pub fn check_engine_version(running: &str, expected: &str) -> Result<()> {
    let running_version = match Version::parse(running) {
        Ok(v) => v,
        Err(e) => {
            warn!(
                "Running engine version '{}' is not X.Y.Z ({}); cannot verify API compatibility",
                running, e
            );
            return Ok(());
        }
    };
    let expected_version = match Version::parse(expected) {
        Ok(v) => v,
        Err(e) => {
            warn!(
                "Expected engine version '{}' is not X.Y.Z ({}); cannot verify API compatibility",
                expected, e
            );
            return Ok(());
        }
    };

    if running_version.major != expected_version.major
        || running_version.minor != expected_version.minor
    {
        return Err(EnclaveError::EngineVersionMismatch {
            running: running_version.to_string(),
            expected: expected_version.to_string(),
        });
    }
    debug!("Engine version {} is compatible", running_version);
    Ok(())
}

// ============================================================================
// Running enclaves
// ============================================================================

/// An enclave whose API container can be dialed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningEnclave {
    pub enclave_id: EnclaveId,
    pub ip_on_host_machine: String,
    pub grpc_port: u16,
    pub grpc_proxy_port: u16,
    pub enclave_data_dirpath: String,
}

impl TryFrom<EnclaveInfo> for RunningEnclave {
    type Error = EnclaveError;

    fn try_from(info: EnclaveInfo) -> Result<Self> {
        let enclave_id = info.enclave_id;
        let not_running = |reason: String| EnclaveError::EnclaveNotRunning {
            enclave_id: enclave_id.clone(),
            reason,
        };

        match EnclaveContainersStatus::try_from(info.containers_status) {
            Ok(EnclaveContainersStatus::Running) => {}
            Ok(status) => {
                return Err(not_running(format!(
                    "containers status is {}",
                    status.as_str_name()
                )))
            }
            Err(_) => {
                return Err(EnclaveError::ProtocolViolation(format!(
                    "Enclave '{}' has unknown containers status {}",
                    enclave_id, info.containers_status
                )))
            }
        }

        match EnclaveApiContainerStatus::try_from(info.api_container_status) {
            Ok(EnclaveApiContainerStatus::Running) => {}
            Ok(status) => {
                return Err(not_running(format!(
                    "API container status is {}",
                    status.as_str_name()
                )))
            }
            Err(_) => {
                return Err(EnclaveError::ProtocolViolation(format!(
                    "Enclave '{}' has unknown API container status {}",
                    enclave_id, info.api_container_status
                )))
            }
        }

        if info.api_container_info.is_none() {
            return Err(EnclaveError::ProtocolViolation(format!(
                "API container of enclave '{}' is running but has no container info",
                enclave_id
            )));
        }
        let host_info = info.api_container_host_machine_info.ok_or_else(|| {
            EnclaveError::ProtocolViolation(format!(
                "API container of enclave '{}' is running but has no host machine info",
                enclave_id
            ))
        })?;

        let port = |field: &str, value: u32| {
            u16::try_from(value).map_err(|_| {
                EnclaveError::ProtocolViolation(format!(
                    "Enclave '{}' reports {} {} above 65535",
                    enclave_id, field, value
                ))
            })
        };
        let grpc_port = port("gRPC port", host_info.grpc_port_on_host_machine)?;
        let grpc_proxy_port = port("gRPC proxy port", host_info.grpc_proxy_port_on_host_machine)?;

        Ok(Self {
            ip_on_host_machine: host_info.ip_on_host_machine,
            grpc_port,
            grpc_proxy_port,
            enclave_data_dirpath: info.enclave_data_dirpath_on_host_machine,
            enclave_id,
        })
    }
}

/// How this host turns a running enclave into an [`EnclaveContext`]
pub trait EnclaveConnector: Send + Sync {
    type Transport: Transport;

    fn connect(&self, enclave: &RunningEnclave) -> Result<EnclaveContext<Self::Transport>>;
}

/// Native host: lazy gRPC channel to the published API container port
#[derive(Debug, Clone)]
pub struct GrpcConnector {
    host: String,
}

impl GrpcConnector {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

impl EnclaveConnector for GrpcConnector {
    type Transport = GrpcTransport;

    fn connect(&self, enclave: &RunningEnclave) -> Result<EnclaveContext<GrpcTransport>> {
        let endpoint = format!("http://{}:{}", self.host, enclave.grpc_port);
        let transport = GrpcTransport::connect_lazy(&endpoint, enclave.enclave_id.clone())?;
        Ok(EnclaveContext::new(
            transport,
            NativePathJoiner,
            FsTgzArchiver::default(),
            enclave.enclave_data_dirpath.clone(),
        ))
    }
}

/// Browser-style host: gRPC-Web through the API container's proxy port
#[derive(Debug, Clone)]
pub struct GrpcWebConnector {
    host: String,
}

impl GrpcWebConnector {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

impl EnclaveConnector for GrpcWebConnector {
    type Transport = GrpcWebTransport;

    fn connect(&self, enclave: &RunningEnclave) -> Result<EnclaveContext<GrpcWebTransport>> {
        let proxy_url = format!("http://{}:{}", self.host, enclave.grpc_proxy_port);
        let transport = GrpcWebTransport::new(&proxy_url, enclave.enclave_id.clone())?;
        Ok(EnclaveContext::new(
            transport,
            PosixPathJoiner,
            UnsupportedArchiver,
            enclave.enclave_data_dirpath.clone(),
        ))
    }
}

// ============================================================================
// Engine context
// ============================================================================

/// Session bound to one engine
pub struct EngineContext<T: Transport, C: EnclaveConnector> {
    client: EngineClient<T>,
    connector: C,
}

impl EngineContext<GrpcTransport, GrpcConnector> {
    /// Native host: dial the engine over gRPC and check its version
    pub async fn connect_grpc(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let transport = GrpcTransport::connect(&config.endpoint, String::new()).await?;
        Self::connect(
            transport,
            GrpcConnector::new(config.api_container_host.clone()),
            &config.expected_engine_version,
        )
        .await
    }
}

impl EngineContext<GrpcWebTransport, GrpcWebConnector> {
    /// Browser-style host: reach the engine through its gRPC-Web proxy
    pub async fn connect_grpc_web(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let proxy_url = config.grpc_web_proxy_url.as_deref().ok_or_else(|| {
            EnclaveError::Config("engine.grpc_web_proxy_url is required for gRPC-Web".to_string())
        })?;
        let transport = GrpcWebTransport::new(proxy_url, String::new())?;
        Self::connect(
            transport,
            GrpcWebConnector::new(config.api_container_host.clone()),
            &config.expected_engine_version,
        )
        .await
    }
}

impl<T: Transport, C: EnclaveConnector> EngineContext<T, C> {
    /// Wrap a transport without contacting the engine
    pub fn new(transport: T, connector: C) -> Self {
        Self {
            client: EngineClient::new(transport),
            connector,
        }
    }

    /// Wrap a transport after checking the engine speaks `expected_version`
    pub async fn connect(transport: T, connector: C, expected_version: &str) -> Result<Self> {
        let ctx = Self::new(transport, connector);
        let engine_info = ctx.client.get_engine_info().await?;
        check_engine_version(&engine_info.engine_version, expected_version)?;
        info!("Connected to engine {}", engine_info.engine_version);
        Ok(ctx)
    }

    /// The underlying client, for requests this type has no helper for
    pub fn client(&self) -> &EngineClient<T> {
        &self.client
    }

    pub async fn create_enclave(
        &self,
        enclave_id: &str,
        is_partitioning_enabled: bool,
    ) -> Result<EnclaveContext<C::Transport>> {
        let resp = self
            .client
            .create_enclave(CreateEnclaveArgs {
                enclave_id: enclave_id.to_string(),
                api_container_version_tag: DEFAULT_API_CONTAINER_VERSION_TAG.to_string(),
                api_container_log_level: API_CONTAINER_LOG_LEVEL.to_string(),
                is_partitioning_enabled,
                should_publish_all_ports: SHOULD_PUBLISH_ALL_PORTS,
            })
            .await?;

        let enclave_info = resp.enclave_info.ok_or_else(|| {
            EnclaveError::ProtocolViolation(format!(
                "Engine created enclave '{}' but returned no enclave info",
                enclave_id
            ))
        })?;
        let enclave = RunningEnclave::try_from(enclave_info)?;
        info!(
            "Created enclave '{}' (partitioning {})",
            enclave.enclave_id,
            if is_partitioning_enabled { "enabled" } else { "disabled" }
        );
        self.connector.connect(&enclave)
    }

    pub async fn get_enclave_context(
        &self,
        enclave_id: &str,
    ) -> Result<EnclaveContext<C::Transport>> {
        let mut resp = self.client.get_enclaves().await?;
        let enclave_info = resp
            .enclave_info
            .remove(enclave_id)
            .ok_or_else(|| EnclaveError::EnclaveNotFound(enclave_id.to_string()))?;
        let enclave = RunningEnclave::try_from(enclave_info)?;
        self.connector.connect(&enclave)
    }

    pub async fn get_enclaves(&self) -> Result<BTreeSet<EnclaveId>> {
        let resp = self.client.get_enclaves().await?;
        Ok(resp.enclave_info.into_keys().collect())
    }

    pub async fn stop_enclave(&self, enclave_id: &str) -> Result<()> {
        self.client
            .stop_enclave(StopEnclaveArgs {
                enclave_id: enclave_id.to_string(),
            })
            .await?;
        info!("Stopped enclave '{}'", enclave_id);
        Ok(())
    }

    pub async fn destroy_enclave(&self, enclave_id: &str) -> Result<()> {
        self.client
            .destroy_enclave(DestroyEnclaveArgs {
                enclave_id: enclave_id.to_string(),
            })
            .await?;
        info!("Destroyed enclave '{}'", enclave_id);
        Ok(())
    }

    /// Remove stopped enclaves, or every enclave when `should_clean_all`
    pub async fn clean(&self, should_clean_all: bool) -> Result<BTreeSet<EnclaveId>> {
        let resp = self.client.clean(CleanArgs { should_clean_all }).await?;
        let removed: BTreeSet<EnclaveId> = resp.removed_enclave_ids.into_keys().collect();
        info!("Cleaned {} enclave(s)", removed.len());
        Ok(removed)
    }
}
