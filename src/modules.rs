/*!
 * Handle to one loaded module
 */

use enclave_core_interface::Transport;
use enclave_proto::ExecuteModuleArgs;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::client::ApiContainerClient;
use crate::error::Result;

pub type ModuleId = String;

/// Executes a loaded module
pub struct ModuleContext<T: Transport> {
    client: Arc<ApiContainerClient<T>>,
    module_id: ModuleId,
}

impl<T: Transport> ModuleContext<T> {
    pub(crate) fn new(client: Arc<ApiContainerClient<T>>, module_id: ModuleId) -> Self {
        Self { client, module_id }
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    /// Run the module with serialized params and return its serialized result
    pub async fn execute(&self, serialized_params: impl Into<String>) -> Result<String> {
        debug!("Executing module '{}'", self.module_id);
        let resp = self
            .client
            .execute_module(ExecuteModuleArgs {
                module_id: self.module_id.clone(),
                serialized_params: serialized_params.into(),
            })
            .await?;
        Ok(resp.serialized_result)
    }
}

impl<T: Transport> fmt::Debug for ModuleContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("module_id", &self.module_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enclave_core_interface::testing::MockTransport;
    use enclave_proto::rpc;
    use enclave_proto::ExecuteModuleResponse;

    #[tokio::test]
    async fn test_execute_forwards_params() {
        let mock = MockTransport::new("e1");
        mock.respond::<rpc::ExecuteModule>(ExecuteModuleResponse {
            serialized_result: r#"{"ok":true}"#.to_string(),
        });
        let ctx = ModuleContext::new(
            Arc::new(ApiContainerClient::new(mock.clone())),
            "datastore".to_string(),
        );

        let result = ctx.execute(r#"{"n":1}"#).await.unwrap();
        assert_eq!(result, r#"{"ok":true}"#);

        let sent = mock.requests::<rpc::ExecuteModule>();
        assert_eq!(sent[0].module_id, "datastore");
        assert_eq!(sent[0].serialized_params, r#"{"n":1}"#);
    }
}
