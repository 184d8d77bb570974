/*!
 * Enclave context: the session object bound to one enclave
 *
 * An [`EnclaveContext`] owns the API container client for one enclave plus
 * the two host-dependent strategies (path joining and archiving). It is the
 * only place a repartition can be issued from.
 */

pub mod archiver;
pub mod path_joiner;

pub use archiver::{Archiver, FsTgzArchiver, UnsupportedArchiver};
pub use path_joiner::{NativePathJoiner, PathJoiner, PosixPathJoiner};

use enclave_connect::{GrpcTransport, GrpcWebTransport};
use enclave_core_interface::Transport;
use enclave_proto::{
    DownloadFilesArtifactArgs, GetModulesArgs, GetServicesArgs, LoadModuleArgs, ModuleInfo,
    PauseServiceArgs, RegisterServiceArgs, RemoveServiceArgs, ServiceInfo,
    StoreFilesArtifactFromServiceArgs, StoreWebFilesArtifactArgs, UnloadModuleArgs,
    UnpauseServiceArgs, UploadFilesArtifactArgs, WaitForHttpGetEndpointAvailabilityArgs,
    WaitForHttpPostEndpointAvailabilityArgs,
};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::client::ApiContainerClient;
use crate::config::ClientConfig;
use crate::error::{EnclaveError, Result};
use crate::modules::{ModuleContext, ModuleId};
use crate::partition::{
    PartitionConnection, PartitionConnections, PartitionServices, ServiceId, Topology,
    DEFAULT_PARTITION_ID,
};
use crate::services::{ports_from_wire, ContainerConfig, PortSpec, ServiceContext, SharedPath};
use path_joiner::posix_join;

/// Where the enclave data directory is mounted inside every service container
pub const SERVICE_ENCLAVE_DATA_DIR_MOUNTPOINT: &str = "/kurtosis-enclave-data";

/// ID the backend assigns to a stored files artifact
pub type FilesArtifactId = String;

/// Parameters for polling an HTTP endpoint on a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpAvailabilityCheck {
    pub port: u16,
    pub path: String,
    pub initial_delay: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
    /// Substring the body must contain; empty accepts any body
    pub body_text: String,
}

impl HttpAvailabilityCheck {
    pub fn new(port: u16, path: impl Into<String>) -> Self {
        Self {
            port,
            path: path.into(),
            initial_delay: Duration::ZERO,
            retries: 10,
            retry_delay: Duration::from_millis(500),
            body_text: String::new(),
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_retries(mut self, retries: u32, retry_delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_body_text(mut self, body_text: impl Into<String>) -> Self {
        self.body_text = body_text.into();
        self
    }
}

fn duration_ms(field: &str, duration: Duration) -> Result<u32> {
    u32::try_from(duration.as_millis()).map_err(|_| {
        EnclaveError::InvalidArgument(format!(
            "{} of {:?} does not fit in u32 milliseconds",
            field, duration
        ))
    })
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(EnclaveError::InvalidArgument(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}

/// Resolve the public address StartService reports against its public ports
fn public_ip(
    service_id: &str,
    maybe_public_ip: String,
    maybe_public_ports: &BTreeMap<String, PortSpec>,
) -> Result<Option<String>> {
    match (maybe_public_ip.is_empty(), maybe_public_ports.is_empty()) {
        (false, _) => Ok(Some(maybe_public_ip)),
        (true, true) => Ok(None),
        (true, false) => Err(EnclaveError::ProtocolViolation(format!(
            "Service '{}' reports {} public port(s) but an empty public IP address",
            service_id,
            maybe_public_ports.len()
        ))),
    }
}

/// Session bound to one enclave's API container
pub struct EnclaveContext<T: Transport> {
    client: Arc<ApiContainerClient<T>>,
    path_joiner: Arc<dyn PathJoiner>,
    archiver: Arc<dyn Archiver>,

    /// Enclave data directory as seen from this host
    enclave_data_dirpath: String,
}

impl<T: Transport> fmt::Debug for EnclaveContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnclaveContext")
            .field("enclave_id", &self.enclave_id())
            .field("enclave_data_dirpath", &self.enclave_data_dirpath)
            .finish()
    }
}

impl EnclaveContext<GrpcTransport> {
    /// Native host: dial the API container over gRPC
    pub async fn connect_grpc(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport =
            GrpcTransport::connect(&config.endpoint, config.enclave_id.clone()).await?;
        Ok(Self::new(
            transport,
            NativePathJoiner,
            FsTgzArchiver::default(),
            config.enclave_data_dirpath.clone(),
        ))
    }

    /// Native host, dialing on first call
    pub fn connect_grpc_lazy(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = GrpcTransport::connect_lazy(&config.endpoint, config.enclave_id.clone())?;
        Ok(Self::new(
            transport,
            NativePathJoiner,
            FsTgzArchiver::default(),
            config.enclave_data_dirpath.clone(),
        ))
    }
}

impl EnclaveContext<GrpcWebTransport> {
    /// Browser-style host: gRPC-Web through `grpc_web_proxy_url`, no local file access
    pub fn new_grpc_web(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let proxy_url = config.grpc_web_proxy_url.as_deref().ok_or_else(|| {
            EnclaveError::Config("grpc_web_proxy_url is required for gRPC-Web".to_string())
        })?;
        let transport = GrpcWebTransport::new(proxy_url, config.enclave_id.clone())?;
        Ok(Self::new(
            transport,
            PosixPathJoiner,
            UnsupportedArchiver,
            config.enclave_data_dirpath.clone(),
        ))
    }
}

impl<T: Transport> EnclaveContext<T> {
    pub fn new(
        transport: T,
        path_joiner: impl PathJoiner + 'static,
        archiver: impl Archiver + 'static,
        enclave_data_dirpath: impl Into<String>,
    ) -> Self {
        Self {
            client: Arc::new(ApiContainerClient::new(transport)),
            path_joiner: Arc::new(path_joiner),
            archiver: Arc::new(archiver),
            enclave_data_dirpath: enclave_data_dirpath.into(),
        }
    }

    pub fn enclave_id(&self) -> &str {
        self.client.enclave_id()
    }

    /// The underlying client, for requests this type has no helper for
    pub fn client(&self) -> &ApiContainerClient<T> {
        &self.client
    }

    fn shared_path_for(&self, relative_service_dirpath: &str) -> SharedPath {
        SharedPath::new(
            self.path_joiner
                .join(&self.enclave_data_dirpath, relative_service_dirpath),
            posix_join(SERVICE_ENCLAVE_DATA_DIR_MOUNTPOINT, relative_service_dirpath),
            Arc::clone(&self.path_joiner),
        )
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Modules
    // ═══════════════════════════════════════════════════════════════════════

    pub async fn load_module(
        &self,
        module_id: &str,
        image: &str,
        serialized_params: &str,
    ) -> Result<ModuleContext<T>> {
        require_non_empty("module ID", module_id)?;
        require_non_empty("module image", image)?;

        self.client
            .load_module(LoadModuleArgs {
                module_id: module_id.to_string(),
                container_image: image.to_string(),
                serialized_params: serialized_params.to_string(),
            })
            .await?;

        info!("Loaded module '{}' from image '{}'", module_id, image);
        Ok(ModuleContext::new(Arc::clone(&self.client), module_id.to_string()))
    }

    pub async fn unload_module(&self, module_id: &str) -> Result<()> {
        let resp = self
            .client
            .unload_module(UnloadModuleArgs {
                module_id: module_id.to_string(),
            })
            .await?;
        info!("Unloaded module '{}' (GUID {})", module_id, resp.module_guid);
        Ok(())
    }

    pub async fn get_module_context(&self, module_id: &str) -> Result<ModuleContext<T>> {
        let mut resp = self
            .client
            .get_modules(GetModulesArgs {
                ids: [(module_id.to_string(), true)].into_iter().collect(),
            })
            .await?;

        let info = resp.module_info.remove(module_id).ok_or_else(|| {
            EnclaveError::ProtocolViolation(format!(
                "Requested module '{}' but the API container did not report it",
                module_id
            ))
        })?;
        if info.private_ip_addr.is_empty() {
            return Err(EnclaveError::ProtocolViolation(format!(
                "Module '{}' was reported with an empty private IP address",
                module_id
            )));
        }

        Ok(ModuleContext::new(Arc::clone(&self.client), module_id.to_string()))
    }

    /// All modules in the enclave
    pub async fn get_modules(&self) -> Result<BTreeMap<ModuleId, ModuleInfo>> {
        let resp = self.client.get_modules(GetModulesArgs::default()).await?;
        let mut modules = BTreeMap::new();
        for (id, info) in resp.module_info {
            if info.private_ip_addr.is_empty() {
                return Err(EnclaveError::ProtocolViolation(format!(
                    "Module '{}' was reported with an empty private IP address",
                    id
                )));
            }
            modules.insert(id, info);
        }
        Ok(modules)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Service lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Add a service to the default partition
    pub async fn add_service<F>(
        &self,
        service_id: &str,
        config_supplier: F,
    ) -> Result<ServiceContext<T>>
    where
        F: FnOnce(&str, &SharedPath) -> anyhow::Result<ContainerConfig>,
    {
        self.add_service_to_partition(service_id, DEFAULT_PARTITION_ID, config_supplier)
            .await
    }

    /// Register, configure and start a service
    ///
    /// `config_supplier` receives the service's private IP and shared
    /// directory, which are only known once the service is registered. If
    /// it fails, the service is never started.
    pub async fn add_service_to_partition<F>(
        &self,
        service_id: &str,
        partition_id: &str,
        config_supplier: F,
    ) -> Result<ServiceContext<T>>
    where
        F: FnOnce(&str, &SharedPath) -> anyhow::Result<ContainerConfig>,
    {
        require_non_empty("service ID", service_id)?;

        debug!(
            "Registering service '{}' in partition '{}'",
            service_id, partition_id
        );
        let registration = self
            .client
            .register_service(RegisterServiceArgs {
                service_id: service_id.to_string(),
                partition_id: partition_id.to_string(),
            })
            .await?;

        if registration.private_ip_addr.is_empty() {
            return Err(EnclaveError::ProtocolViolation(format!(
                "Service '{}' was registered with an empty private IP address",
                service_id
            )));
        }
        let shared_directory = self.shared_path_for(&registration.relative_service_dirpath);

        trace!(
            "Generating container config for service '{}' at {}",
            service_id,
            registration.private_ip_addr
        );
        let config = config_supplier(&registration.private_ip_addr, &shared_directory).map_err(
            |e| EnclaveError::ContainerConfigSupplier {
                service_id: service_id.to_string(),
                reason: format!("{:#}", e),
            },
        )?;

        debug!(
            "Starting service '{}' from image '{}'",
            service_id,
            config.image()
        );
        let started = self
            .client
            .start_service(
                config.to_start_service_args(service_id, SERVICE_ENCLAVE_DATA_DIR_MOUNTPOINT),
            )
            .await?;

        let maybe_public_ports = ports_from_wire(&started.maybe_public_ports)?;
        let maybe_public_ip = public_ip(
            service_id,
            started.maybe_public_ip_addr,
            &maybe_public_ports,
        )?;

        info!(
            "Added service '{}' at {} in partition '{}'",
            service_id, registration.private_ip_addr, partition_id
        );
        Ok(ServiceContext::new(
            Arc::clone(&self.client),
            service_id.to_string(),
            registration.private_ip_addr,
            config.used_ports().clone(),
            maybe_public_ip,
            maybe_public_ports,
            shared_directory,
        ))
    }

    /// Stop and remove a service, waiting up to `container_stop_timeout` for it to exit
    pub async fn remove_service(
        &self,
        service_id: &str,
        container_stop_timeout: Duration,
    ) -> Result<()> {
        let resp = self
            .client
            .remove_service(RemoveServiceArgs {
                service_id: service_id.to_string(),
                container_stop_timeout_seconds: container_stop_timeout.as_secs(),
            })
            .await?;
        info!("Removed service '{}' (GUID {})", service_id, resp.service_guid);
        Ok(())
    }

    pub async fn pause_service(&self, service_id: &str) -> Result<()> {
        self.client
            .pause_service(PauseServiceArgs {
                service_id: service_id.to_string(),
            })
            .await?;
        info!("Paused service '{}'", service_id);
        Ok(())
    }

    pub async fn unpause_service(&self, service_id: &str) -> Result<()> {
        self.client
            .unpause_service(UnpauseServiceArgs {
                service_id: service_id.to_string(),
            })
            .await?;
        info!("Unpaused service '{}'", service_id);
        Ok(())
    }

    /// Handle to an existing service, built from what the backend reports
    ///
    /// Fails if the backend reports the service with an empty private or
    /// public address.
    pub async fn get_service_context(&self, service_id: &str) -> Result<ServiceContext<T>> {
        let mut resp = self
            .client
            .get_services(GetServicesArgs {
                service_ids: [(service_id.to_string(), true)].into_iter().collect(),
            })
            .await?;

        let info = resp.service_info.remove(service_id).ok_or_else(|| {
            EnclaveError::ProtocolViolation(format!(
                "Requested service '{}' but the API container did not report it",
                service_id
            ))
        })?;
        if info.private_ip_addr.is_empty() {
            return Err(EnclaveError::ProtocolViolation(format!(
                "Service '{}' was reported with an empty private IP address",
                service_id
            )));
        }
        // A running service always has a public address, even with no public ports
        if info.maybe_public_ip_addr.is_empty() {
            return Err(EnclaveError::ProtocolViolation(format!(
                "Service '{}' was reported with an empty public IP address",
                service_id
            )));
        }

        let private_ports = ports_from_wire(&info.private_ports)?;
        let maybe_public_ports = ports_from_wire(&info.maybe_public_ports)?;
        let shared_directory = self.shared_path_for(&info.relative_service_dirpath);

        Ok(ServiceContext::new(
            Arc::clone(&self.client),
            service_id.to_string(),
            info.private_ip_addr,
            private_ports,
            Some(info.maybe_public_ip_addr),
            maybe_public_ports,
            shared_directory,
        ))
    }

    /// All services in the enclave
    pub async fn get_services(&self) -> Result<BTreeMap<ServiceId, ServiceInfo>> {
        let resp = self.client.get_services(GetServicesArgs::default()).await?;
        let mut services = BTreeMap::new();
        for (id, info) in resp.service_info {
            if info.private_ip_addr.is_empty() {
                return Err(EnclaveError::ProtocolViolation(format!(
                    "Service '{}' was reported with an empty private IP address",
                    id
                )));
            }
            services.insert(id, info);
        }
        Ok(services)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Network
    // ═══════════════════════════════════════════════════════════════════════

    /// Replace the enclave's whole network topology
    ///
    /// `partition_services` and `default_connection` are required; a missing
    /// `partition_connections` means every pair uses the default. Nothing is
    /// sent if the topology is invalid.
    pub async fn repartition_network(
        &self,
        partition_services: Option<PartitionServices>,
        partition_connections: Option<PartitionConnections>,
        default_connection: Option<PartitionConnection>,
    ) -> Result<()> {
        let topology = Topology::new(
            partition_services,
            partition_connections,
            default_connection,
        )?;

        info!(
            "Repartitioning enclave '{}' into {} partition(s) with {} explicit connection(s)",
            self.enclave_id(),
            topology.partition_services().len(),
            topology.connections().len()
        );
        self.client
            .repartition(topology.to_repartition_args())
            .await?;
        Ok(())
    }

    pub async fn wait_for_http_get_endpoint_availability(
        &self,
        service_id: &str,
        check: &HttpAvailabilityCheck,
    ) -> Result<()> {
        let args = WaitForHttpGetEndpointAvailabilityArgs {
            service_id: service_id.to_string(),
            port: u32::from(check.port),
            path: check.path.clone(),
            initial_delay_milliseconds: duration_ms("initial delay", check.initial_delay)?,
            retries: check.retries,
            retries_delay_milliseconds: duration_ms("retry delay", check.retry_delay)?,
            body_text: check.body_text.clone(),
        };
        self.client
            .wait_for_http_get_endpoint_availability(args)
            .await?;
        debug!(
            "GET {}:{}{} is available",
            service_id, check.port, check.path
        );
        Ok(())
    }

    pub async fn wait_for_http_post_endpoint_availability(
        &self,
        service_id: &str,
        check: &HttpAvailabilityCheck,
        request_body: &str,
    ) -> Result<()> {
        let args = WaitForHttpPostEndpointAvailabilityArgs {
            service_id: service_id.to_string(),
            port: u32::from(check.port),
            path: check.path.clone(),
            request_body: request_body.to_string(),
            initial_delay_milliseconds: duration_ms("initial delay", check.initial_delay)?,
            retries: check.retries,
            retries_delay_milliseconds: duration_ms("retry delay", check.retry_delay)?,
            body_text: check.body_text.clone(),
        };
        self.client
            .wait_for_http_post_endpoint_availability(args)
            .await?;
        debug!(
            "POST {}:{}{} is available",
            service_id, check.port, check.path
        );
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Files artifacts
    // ═══════════════════════════════════════════════════════════════════════

    /// Archive a local file or directory and store it as a files artifact
    pub async fn upload_files(
        &self,
        path: impl AsRef<Path>,
        name: &str,
    ) -> Result<FilesArtifactId> {
        let path = path.as_ref().to_path_buf();
        let archiver = Arc::clone(&self.archiver);

        let data = tokio::task::spawn_blocking(move || archiver.archive(&path))
            .await
            .map_err(|e| EnclaveError::Archive(format!("Archiving task failed: {}", e)))??;

        self.upload_files_archive(data, name).await
    }

    /// Store already-archived `.tgz` bytes as a files artifact
    pub async fn upload_files_archive(&self, data: Vec<u8>, name: &str) -> Result<FilesArtifactId> {
        let size = data.len();
        let resp = self
            .client
            .upload_files_artifact(UploadFilesArtifactArgs {
                data,
                name: name.to_string(),
            })
            .await?;
        info!(
            "Uploaded {} bytes as files artifact '{}' ({})",
            size, resp.name, resp.uuid
        );
        Ok(resp.uuid)
    }

    /// Have the backend download `url` into a files artifact
    pub async fn store_web_files(&self, url: &str, name: &str) -> Result<FilesArtifactId> {
        require_non_empty("URL", url)?;
        let resp = self
            .client
            .store_web_files_artifact(StoreWebFilesArtifactArgs {
                url: url.to_string(),
                name: name.to_string(),
            })
            .await?;
        info!("Stored {} as files artifact {}", url, resp.uuid);
        Ok(resp.uuid)
    }

    /// Copy `source_path` out of a service container into a files artifact
    pub async fn store_service_files(
        &self,
        service_id: &str,
        source_path: &str,
        name: &str,
    ) -> Result<FilesArtifactId> {
        let resp = self
            .client
            .store_files_artifact_from_service(StoreFilesArtifactFromServiceArgs {
                service_id: service_id.to_string(),
                source_path: source_path.to_string(),
                name: name.to_string(),
            })
            .await?;
        info!(
            "Stored {} from service '{}' as files artifact {}",
            source_path, service_id, resp.uuid
        );
        Ok(resp.uuid)
    }

    /// Raw `.tgz` contents of a files artifact, by UUID or name
    pub async fn download_files_artifact(&self, identifier: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .download_files_artifact(DownloadFilesArtifactArgs {
                identifier: identifier.to_string(),
            })
            .await?;
        Ok(resp.data)
    }
}
