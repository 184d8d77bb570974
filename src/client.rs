/*!
 * Transport-agnostic API container client
 *
 * One method per remote operation. Each takes a fully-formed request and
 * returns the backend's response, or the transport's error unchanged. The
 * enclave is fixed by the transport, so it is never passed per call.
 */

use enclave_core_interface::{Result, Transport, TransportExt};
use enclave_proto::rpc;
use enclave_proto::*;

/// Typed facade over a [`Transport`]
#[derive(Debug, Clone)]
pub struct ApiContainerClient<T> {
    transport: T,
}

impl<T: Transport> ApiContainerClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn enclave_id(&self) -> &str {
        self.transport.enclave_id()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Modules
    // ═══════════════════════════════════════════════════════════════════════

    pub async fn load_module(&self, args: LoadModuleArgs) -> Result<()> {
        self.transport.invoke::<rpc::LoadModule>(args).await
    }

    pub async fn unload_module(&self, args: UnloadModuleArgs) -> Result<UnloadModuleResponse> {
        self.transport.invoke::<rpc::UnloadModule>(args).await
    }

    pub async fn get_modules(&self, args: GetModulesArgs) -> Result<GetModulesResponse> {
        self.transport.invoke::<rpc::GetModules>(args).await
    }

    pub async fn execute_module(&self, args: ExecuteModuleArgs) -> Result<ExecuteModuleResponse> {
        self.transport.invoke::<rpc::ExecuteModule>(args).await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Services
    // ═══════════════════════════════════════════════════════════════════════

    pub async fn register_service(
        &self,
        args: RegisterServiceArgs,
    ) -> Result<RegisterServiceResponse> {
        self.transport.invoke::<rpc::RegisterService>(args).await
    }

    pub async fn start_service(&self, args: StartServiceArgs) -> Result<StartServiceResponse> {
        self.transport.invoke::<rpc::StartService>(args).await
    }

    pub async fn get_services(&self, args: GetServicesArgs) -> Result<GetServicesResponse> {
        self.transport.invoke::<rpc::GetServices>(args).await
    }

    pub async fn remove_service(&self, args: RemoveServiceArgs) -> Result<RemoveServiceResponse> {
        self.transport.invoke::<rpc::RemoveService>(args).await
    }

    pub async fn exec_command(&self, args: ExecCommandArgs) -> Result<ExecCommandResponse> {
        self.transport.invoke::<rpc::ExecCommand>(args).await
    }

    pub async fn pause_service(&self, args: PauseServiceArgs) -> Result<()> {
        self.transport.invoke::<rpc::PauseService>(args).await
    }

    pub async fn unpause_service(&self, args: UnpauseServiceArgs) -> Result<()> {
        self.transport.invoke::<rpc::UnpauseService>(args).await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Network
    // ═══════════════════════════════════════════════════════════════════════

    pub async fn repartition(&self, args: RepartitionArgs) -> Result<()> {
        self.transport.invoke::<rpc::Repartition>(args).await
    }

    pub async fn wait_for_http_get_endpoint_availability(
        &self,
        args: WaitForHttpGetEndpointAvailabilityArgs,
    ) -> Result<()> {
        self.transport
            .invoke::<rpc::WaitForHttpGetEndpointAvailability>(args)
            .await
    }

    pub async fn wait_for_http_post_endpoint_availability(
        &self,
        args: WaitForHttpPostEndpointAvailabilityArgs,
    ) -> Result<()> {
        self.transport
            .invoke::<rpc::WaitForHttpPostEndpointAvailability>(args)
            .await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Files artifacts
    // ═══════════════════════════════════════════════════════════════════════

    pub async fn upload_files_artifact(
        &self,
        args: UploadFilesArtifactArgs,
    ) -> Result<UploadFilesArtifactResponse> {
        self.transport.invoke::<rpc::UploadFilesArtifact>(args).await
    }

    pub async fn download_files_artifact(
        &self,
        args: DownloadFilesArtifactArgs,
    ) -> Result<DownloadFilesArtifactResponse> {
        self.transport.invoke::<rpc::DownloadFilesArtifact>(args).await
    }

    pub async fn store_web_files_artifact(
        &self,
        args: StoreWebFilesArtifactArgs,
    ) -> Result<StoreWebFilesArtifactResponse> {
        self.transport.invoke::<rpc::StoreWebFilesArtifact>(args).await
    }

    pub async fn store_files_artifact_from_service(
        &self,
        args: StoreFilesArtifactFromServiceArgs,
    ) -> Result<StoreFilesArtifactFromServiceResponse> {
        self.transport
            .invoke::<rpc::StoreFilesArtifactFromService>(args)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enclave_core_interface::testing::MockTransport;
    use enclave_core_interface::{StatusCode, TransportError};

    #[tokio::test]
    async fn test_request_forwarded_unchanged() {
        let mock = MockTransport::new("e1");
        mock.respond::<rpc::RemoveService>(RemoveServiceResponse {
            service_guid: "web-123".to_string(),
        });
        let client = ApiContainerClient::new(mock.clone());

        let resp = client
            .remove_service(RemoveServiceArgs {
                service_id: "web".to_string(),
                container_stop_timeout_seconds: 7,
            })
            .await
            .unwrap();
        assert_eq!(resp.service_guid, "web-123");

        let sent = mock.requests::<rpc::RemoveService>();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].container_stop_timeout_seconds, 7);
        assert_eq!(client.enclave_id(), "e1");
    }

    #[tokio::test]
    async fn test_backend_error_propagated_unchanged() {
        let mock = MockTransport::new("e1");
        let backend_err = TransportError::Rejected {
            code: StatusCode::Unknown,
            message: "No service with ID 'ghost'".to_string(),
        };
        mock.fail::<rpc::PauseService>(backend_err.clone());
        let client = ApiContainerClient::new(mock);

        let err = client
            .pause_service(PauseServiceArgs {
                service_id: "ghost".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, backend_err);
    }

    #[tokio::test]
    async fn test_empty_response_is_failure() {
        let mock = MockTransport::new("e1");
        mock.respond_empty::<rpc::Repartition>();
        let client = ApiContainerClient::new(mock);

        let err = client
            .repartition(RepartitionArgs::default())
            .await
            .unwrap_err();
        assert!(err.is_protocol_violation());
    }
}
