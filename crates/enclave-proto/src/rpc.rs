//! Method descriptors for `api_container_api.ApiContainerService` and, in
//! [`engine`], `engine_api.EngineService`.
//!
//! Each remote operation is a zero-sized type implementing [`Rpc`]. The
//! associated types fix the request/response pair at compile time, so a
//! transport cannot send the wrong message to a method.

use crate::api_container::v1::*;

/// Fully-qualified protobuf service name.
pub const SERVICE_NAME: &str = "api_container_api.ApiContainerService";

/// Descriptor for one unary method.
pub trait Rpc: Send + Sync + 'static {
    /// Request message.
    type Request: prost::Message + Default + Clone + Send + Sync + 'static;

    /// Response message. `()` stands in for `google.protobuf.Empty`.
    type Response: prost::Message + Default + Send + Sync + 'static;

    /// Bare method name, e.g. `Repartition`.
    const NAME: &'static str;

    /// HTTP/2 path, e.g. `/api_container_api.ApiContainerService/Repartition`.
    const PATH: &'static str;
}

macro_rules! rpc {
    (@ $service:literal, $(#[$doc:meta])* $name:ident: $req:ty => $resp:ty) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Rpc for $name {
            type Request = $req;
            type Response = $resp;
            const NAME: &'static str = stringify!($name);
            const PATH: &'static str = concat!("/", $service, "/", stringify!($name));
        }
    };
    ($(#[$doc:meta])* $name:ident: $req:ty => $resp:ty) => {
        rpc!(@ "api_container_api.ApiContainerService", $(#[$doc])* $name: $req => $resp);
    };
}

rpc!(
    /// Starts a module container.
    LoadModule: LoadModuleArgs => ()
);
rpc!(
    /// Stops and removes a module container.
    UnloadModule: UnloadModuleArgs => UnloadModuleResponse
);
rpc!(
    /// Lists modules, optionally filtered by ID.
    GetModules: GetModulesArgs => GetModulesResponse
);
rpc!(
    /// Runs a module's execute function.
    ExecuteModule: ExecuteModuleArgs => ExecuteModuleResponse
);
rpc!(
    /// Reserves an IP and a data directory for a new service.
    RegisterService: RegisterServiceArgs => RegisterServiceResponse
);
rpc!(
    /// Starts the container of a registered service.
    StartService: StartServiceArgs => StartServiceResponse
);
rpc!(
    /// Lists services, optionally filtered by ID.
    GetServices: GetServicesArgs => GetServicesResponse
);
rpc!(
    /// Stops and removes a service.
    RemoveService: RemoveServiceArgs => RemoveServiceResponse
);
rpc!(
    /// Executes a command inside a running service container.
    ExecCommand: ExecCommandArgs => ExecCommandResponse
);
rpc!(
    /// Freezes every process in a service container.
    PauseService: PauseServiceArgs => ()
);
rpc!(
    /// Resumes a paused service container.
    UnpauseService: UnpauseServiceArgs => ()
);
rpc!(
    /// Replaces the network partition layout of the enclave.
    Repartition: RepartitionArgs => ()
);
rpc!(
    /// Polls an HTTP GET endpoint on a service until it answers.
    WaitForHttpGetEndpointAvailability: WaitForHttpGetEndpointAvailabilityArgs => ()
);
rpc!(
    /// Polls an HTTP POST endpoint on a service until it answers.
    WaitForHttpPostEndpointAvailability: WaitForHttpPostEndpointAvailabilityArgs => ()
);
rpc!(
    /// Stores a gzipped tarball as a files artifact.
    UploadFilesArtifact: UploadFilesArtifactArgs => UploadFilesArtifactResponse
);
rpc!(
    /// Fetches the contents of a files artifact.
    DownloadFilesArtifact: DownloadFilesArtifactArgs => DownloadFilesArtifactResponse
);
rpc!(
    /// Has the backend download a URL into a files artifact.
    StoreWebFilesArtifact: StoreWebFilesArtifactArgs => StoreWebFilesArtifactResponse
);
rpc!(
    /// Copies a path out of a service container into a files artifact.
    StoreFilesArtifactFromService: StoreFilesArtifactFromServiceArgs => StoreFilesArtifactFromServiceResponse
);

/// Method descriptors for the engine that creates and destroys enclaves.
pub mod engine {
    use super::Rpc;
    use crate::engine_api::v1::*;

    /// Fully-qualified protobuf service name.
    pub const SERVICE_NAME: &str = "engine_api.EngineService";

    rpc!(
        @ "engine_api.EngineService",
        /// Reports the engine version.
        GetEngineInfo: () => GetEngineInfoResponse
    );
    rpc!(
        @ "engine_api.EngineService",
        /// Creates an enclave and starts its API container.
        CreateEnclave: CreateEnclaveArgs => CreateEnclaveResponse
    );
    rpc!(
        @ "engine_api.EngineService",
        /// Lists every enclave the engine knows about.
        GetEnclaves: () => GetEnclavesResponse
    );
    rpc!(
        @ "engine_api.EngineService",
        /// Stops an enclave's containers without removing them.
        StopEnclave: StopEnclaveArgs => ()
    );
    rpc!(
        @ "engine_api.EngineService",
        /// Stops and removes an enclave.
        DestroyEnclave: DestroyEnclaveArgs => ()
    );
    rpc!(
        @ "engine_api.EngineService",
        /// Removes stopped enclaves, or all of them.
        Clean: CleanArgs => CleanResponse
    );
}
