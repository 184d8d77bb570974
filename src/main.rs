/*!
 * Enclave CLI - Command Line Interface
 *
 * Thin front end over `EnclaveContext` and `EngineContext`: picks the gRPC or
 * gRPC-Web transport from configuration and maps errors onto process exit
 * codes.
 */

use clap::{Parser, Subcommand, ValueEnum};
use enclave::{
    cli_style::{
        self, enclaves_table, kv_table, modules_table, print_error, print_info, print_success,
        section_header, services_table, Theme,
    },
    config::{ClientConfig, EngineConfig, LogLevel, TopologyConfig},
    error::{EnclaveError, Result, EXIT_SUCCESS},
    logging, ContainerConfig, EnclaveConnector, EnclaveContext, EngineContext,
    HttpAvailabilityCheck, PortSpec, Transport,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "enclave")]
#[command(version, about = "Drive services, modules, files artifacts and network partitions in an enclave", long_about = None)]
struct Cli {
    /// Client configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// gRPC endpoint of the API container
    #[arg(long, value_name = "URL", global = true)]
    endpoint: Option<String>,

    /// Use gRPC-Web through this proxy instead of native gRPC
    #[arg(long = "grpc-web-proxy", value_name = "URL", global = true)]
    grpc_web_proxy: Option<String>,

    /// gRPC endpoint of the engine
    #[arg(long = "engine-endpoint", value_name = "URL", global = true)]
    engine_endpoint: Option<String>,

    /// Enclave ID
    #[arg(short = 'e', long = "enclave-id", value_name = "ID", global = true)]
    enclave_id: Option<String>,

    /// Log level
    #[arg(long = "log-level", value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Log file path (default: stdout)
    #[arg(long = "log", value_name = "FILE", global = true)]
    log: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, list and tear down enclaves through the engine
    Enclaves {
        #[command(subcommand)]
        command: EngineCommands,
    },

    #[command(flatten)]
    Enclave(EnclaveCommands),
}

#[derive(Subcommand)]
enum EngineCommands {
    /// List enclaves
    #[command(visible_alias = "ls")]
    List,

    /// Create an enclave and start its API container
    Create {
        id: String,

        /// Allow the enclave network to be repartitioned
        #[arg(long)]
        partitioning: bool,
    },

    /// Stop an enclave's containers
    Stop { id: String },

    /// Stop and remove an enclave
    Destroy { id: String },

    /// Remove stopped enclaves
    Clean {
        /// Remove running enclaves too
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
enum EnclaveCommands {
    /// List services in the enclave
    Services,

    /// List modules in the enclave
    Modules,

    /// Register and start a service
    AddService {
        /// Service ID
        #[arg(long)]
        id: String,

        /// Container image
        #[arg(long)]
        image: String,

        /// Partition to place the service in (default partition if omitted)
        #[arg(long, default_value = "")]
        partition: String,

        /// Port the container listens on, as NAME=NUMBER[/PROTOCOL]
        #[arg(long = "port", value_name = "NAME=SPEC")]
        ports: Vec<String>,

        /// Port to publish on the host, as NAME=NUMBER[/PROTOCOL]
        #[arg(long = "public-port", value_name = "NAME=SPEC")]
        public_ports: Vec<String>,

        /// Environment variable, as KEY=VALUE
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,

        /// Files artifact to mount, as UUID=DIRPATH
        #[arg(long = "artifact", value_name = "UUID=DIRPATH")]
        artifacts: Vec<String>,

        /// Override the image entrypoint
        #[arg(long, value_name = "ARG", num_args = 1..)]
        entrypoint: Option<Vec<String>>,

        /// Override the image command
        #[arg(last = true)]
        cmd: Vec<String>,
    },

    /// Stop and remove a service
    RemoveService {
        id: String,

        /// Seconds to wait for the container to stop
        #[arg(long, default_value = "10")]
        timeout: u64,
    },

    /// Pause a running service
    Pause { id: String },

    /// Resume a paused service
    Unpause { id: String },

    /// Run a command inside a service container
    Exec {
        #[arg(long)]
        service: String,

        #[arg(last = true, required = true)]
        argv: Vec<String>,
    },

    /// Replace the network topology from a TOML file
    Repartition {
        #[arg(long, value_name = "FILE")]
        topology: PathBuf,
    },

    /// Wait until an HTTP endpoint on a service responds
    WaitHttp {
        #[arg(long)]
        service: String,

        #[arg(long)]
        port: u16,

        #[arg(long, default_value = "/")]
        path: String,

        /// Send a POST with this body instead of a GET
        #[arg(long)]
        post_body: Option<String>,

        #[arg(long, default_value = "0")]
        initial_delay_ms: u64,

        #[arg(long, default_value = "10")]
        retries: u32,

        #[arg(long, default_value = "500")]
        retry_delay_ms: u64,

        /// Substring the response body must contain
        #[arg(long, default_value = "")]
        body_text: String,
    },

    /// Archive a local file or directory and upload it as a files artifact
    Upload {
        path: PathBuf,

        #[arg(long, default_value = "")]
        name: String,
    },

    /// Download a files artifact to a local .tgz file
    Download {
        /// Artifact UUID or name
        identifier: String,

        #[arg(short = 'o', long)]
        output: PathBuf,
    },

    /// Have the backend fetch a URL into a files artifact
    StoreWeb {
        url: String,

        #[arg(long, default_value = "")]
        name: String,
    },

    /// Copy a path out of a service container into a files artifact
    StoreService {
        #[arg(long)]
        service: String,

        #[arg(long)]
        path: String,

        #[arg(long, default_value = "")]
        name: String,
    },

    /// Load a module from a container image
    LoadModule {
        #[arg(long)]
        id: String,

        #[arg(long)]
        image: String,

        #[arg(long, default_value = "{}")]
        params: String,
    },

    /// Execute a loaded module
    ExecModule {
        #[arg(long)]
        id: String,

        #[arg(long, default_value = "{}")]
        params: String,
    },

    /// Unload a module
    UnloadModule { id: String },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            print_error(&e.to_string(), hint_for(&e));
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn hint_for(e: &EnclaveError) -> Option<&'static str> {
    match e.category() {
        enclave::ErrorCategory::Transport => Some(
            "Check that the engine or API container is running and the endpoint is correct",
        ),
        enclave::ErrorCategory::Configuration => Some("Check the --config file and CLI flags"),
        _ => None,
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(endpoint) = cli.engine_endpoint {
        config.engine.endpoint = endpoint;
    }
    if let Some(proxy) = cli.grpc_web_proxy {
        config.grpc_web_proxy_url = Some(proxy);
    }
    if let Some(enclave_id) = cli.enclave_id {
        config.enclave_id = enclave_id;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log;
    }
    config.verbose |= cli.verbose;

    if let Err(e) = logging::init_logging(&config) {
        cli_style::print_warning(&format!("Failed to initialize logging: {}", e));
    }

    let command = cli.command;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match command {
            Commands::Enclaves { command } => run_engine(&config.engine, command).await,
            Commands::Enclave(command) => run_enclave(&config, command).await,
        }
    })
}

async fn run_engine(config: &EngineConfig, command: EngineCommands) -> Result<()> {
    if config.grpc_web_proxy_url.is_some() {
        let ctx = EngineContext::connect_grpc_web(config).await?;
        run_engine_command(&ctx, command).await
    } else {
        let ctx = EngineContext::connect_grpc(config).await?;
        run_engine_command(&ctx, command).await
    }
}

async fn run_engine_command<T: Transport, C: EnclaveConnector>(
    ctx: &EngineContext<T, C>,
    command: EngineCommands,
) -> Result<()> {
    match command {
        EngineCommands::List => {
            let enclaves = ctx.get_enclaves().await?;
            section_header("Enclaves");
            if enclaves.is_empty() {
                print_info("No enclaves");
            } else {
                println!("{}", enclaves_table(&enclaves));
            }
        }
        EngineCommands::Create { id, partitioning } => {
            let enclave = ctx.create_enclave(&id, partitioning).await?;
            print_success(&format!("Enclave '{}' created", enclave.enclave_id()));
        }
        EngineCommands::Stop { id } => {
            ctx.stop_enclave(&id).await?;
            print_success(&format!("Enclave '{}' stopped", id));
        }
        EngineCommands::Destroy { id } => {
            ctx.destroy_enclave(&id).await?;
            print_success(&format!("Enclave '{}' destroyed", id));
        }
        EngineCommands::Clean { all } => {
            let removed = ctx.clean(all).await?;
            if removed.is_empty() {
                print_info("Nothing to clean");
            } else {
                print_success(&format!("Removed {} enclave(s)", removed.len()));
                println!("{}", enclaves_table(&removed));
            }
        }
    }

    Ok(())
}

async fn run_enclave(config: &ClientConfig, command: EnclaveCommands) -> Result<()> {
    if config.grpc_web_proxy_url.is_some() {
        let ctx = EnclaveContext::new_grpc_web(config)?;
        run_command(&ctx, command).await
    } else {
        let ctx = EnclaveContext::connect_grpc(config).await?;
        run_command(&ctx, command).await
    }
}

async fn run_command<T: Transport>(
    ctx: &EnclaveContext<T>,
    command: EnclaveCommands,
) -> Result<()> {
    match command {
        EnclaveCommands::Services => {
            let services = ctx.get_services().await?;
            section_header(&format!("Services in enclave {}", ctx.enclave_id()));
            if services.is_empty() {
                print_info("No services");
            } else {
                println!("{}", services_table(&services));
            }
        }
        EnclaveCommands::Modules => {
            let modules = ctx.get_modules().await?;
            section_header(&format!("Modules in enclave {}", ctx.enclave_id()));
            if modules.is_empty() {
                print_info("No modules");
            } else {
                println!("{}", modules_table(&modules));
            }
        }
        EnclaveCommands::AddService {
            id,
            image,
            partition,
            ports,
            public_ports,
            env,
            artifacts,
            entrypoint,
            cmd,
        } => {
            let mut builder = ContainerConfig::builder(image);
            for (name, spec) in parse_pairs("--port", &ports)? {
                builder = builder.with_used_port(name, spec.parse::<PortSpec>()?);
            }
            for (name, spec) in parse_pairs("--public-port", &public_ports)? {
                builder = builder.with_public_port(name, spec.parse::<PortSpec>()?);
            }
            for (key, value) in parse_pairs("--env", &env)? {
                builder = builder.with_env_var(key, value);
            }
            for (uuid, dirpath) in parse_pairs("--artifact", &artifacts)? {
                builder = builder.with_files_artifact(uuid, dirpath);
            }
            if let Some(args) = entrypoint {
                builder = builder.with_entrypoint_override(args);
            }
            if !cmd.is_empty() {
                builder = builder.with_cmd_override(cmd);
            }
            let config = builder.build();

            let service = ctx
                .add_service_to_partition(&id, &partition, |_private_ip, _shared| Ok(config))
                .await?;

            print_success(&format!("Service '{}' started", service.service_id()));
            let mut rows = vec![
                ("Private IP", service.private_ip().to_string()),
                (
                    "Shared dir (host)",
                    service.shared_directory().abs_path_on_this_host().to_string(),
                ),
            ];
            if let Some(ip) = service.maybe_public_ip() {
                rows.push(("Public IP", ip.to_string()));
            }
            for (name, spec) in service.maybe_public_ports() {
                rows.push(("Public port", format!("{}={}", name, spec)));
            }
            println!("{}", kv_table(&rows));
        }
        EnclaveCommands::RemoveService { id, timeout } => {
            ctx.remove_service(&id, Duration::from_secs(timeout)).await?;
            print_success(&format!("Service '{}' removed", id));
        }
        EnclaveCommands::Pause { id } => {
            ctx.pause_service(&id).await?;
            print_success(&format!("Service '{}' paused", id));
        }
        EnclaveCommands::Unpause { id } => {
            ctx.unpause_service(&id).await?;
            print_success(&format!("Service '{}' unpaused", id));
        }
        EnclaveCommands::Exec { service, argv } => {
            let service = ctx.get_service_context(&service).await?;
            let result = service.exec_command(argv).await?;
            print!("{}", result.logs);
            if result.exit_code == 0 {
                print_success("Command exited with code 0");
            } else {
                println!(
                    "{}",
                    Theme::error(format!("Command exited with code {}", result.exit_code))
                );
            }
        }
        EnclaveCommands::Repartition { topology } => {
            let (services, connections, default_connection) =
                TopologyConfig::from_file(&topology)?.into_parts()?;
            let partitions = services.len();
            ctx.repartition_network(Some(services), Some(connections), default_connection)
                .await?;
            print_success(&format!("Network repartitioned into {} partition(s)", partitions));
        }
        EnclaveCommands::WaitHttp {
            service,
            port,
            path,
            post_body,
            initial_delay_ms,
            retries,
            retry_delay_ms,
            body_text,
        } => {
            let check = HttpAvailabilityCheck::new(port, path)
                .with_initial_delay(Duration::from_millis(initial_delay_ms))
                .with_retries(retries, Duration::from_millis(retry_delay_ms))
                .with_body_text(body_text);
            match post_body {
                Some(body) => {
                    ctx.wait_for_http_post_endpoint_availability(&service, &check, &body)
                        .await?
                }
                None => {
                    ctx.wait_for_http_get_endpoint_availability(&service, &check)
                        .await?
                }
            }
            print_success(&format!(
                "{}:{}{} is available",
                service, check.port, check.path
            ));
        }
        EnclaveCommands::Upload { path, name } => {
            let uuid = ctx.upload_files(&path, &name).await?;
            print_success(&format!("Uploaded {} as {}", path.display(), uuid));
        }
        EnclaveCommands::Download { identifier, output } => {
            let data = ctx.download_files_artifact(&identifier).await?;
            tokio::fs::write(&output, &data).await?;
            print_success(&format!(
                "Wrote {} bytes to {}",
                data.len(),
                output.display()
            ));
        }
        EnclaveCommands::StoreWeb { url, name } => {
            let uuid = ctx.store_web_files(&url, &name).await?;
            print_success(&format!("Stored {} as {}", url, uuid));
        }
        EnclaveCommands::StoreService {
            service,
            path,
            name,
        } => {
            let uuid = ctx.store_service_files(&service, &path, &name).await?;
            print_success(&format!("Stored {}:{} as {}", service, path, uuid));
        }
        EnclaveCommands::LoadModule { id, image, params } => {
            check_json_params(&params)?;
            ctx.load_module(&id, &image, &params).await?;
            print_success(&format!("Module '{}' loaded", id));
        }
        EnclaveCommands::ExecModule { id, params } => {
            check_json_params(&params)?;
            let module = ctx.get_module_context(&id).await?;
            let result = module.execute(params).await?;
            println!("{}", result);
        }
        EnclaveCommands::UnloadModule { id } => {
            ctx.unload_module(&id).await?;
            print_success(&format!("Module '{}' unloaded", id));
        }
    }

    Ok(())
}

/// Modules take serialized JSON parameters
fn check_json_params(params: &str) -> Result<()> {
    serde_json::from_str::<serde_json::Value>(params)
        .map(|_| ())
        .map_err(|e| EnclaveError::InvalidArgument(format!("--params is not valid JSON: {}", e)))
}

/// Split `KEY=VALUE` arguments
fn parse_pairs(flag: &str, raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|item| {
            item.split_once('=')
                .filter(|(key, _)| !key.is_empty())
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .ok_or_else(|| {
                    EnclaveError::InvalidArgument(format!(
                        "{} expects KEY=VALUE, got '{}'",
                        flag, item
                    ))
                })
        })
        .collect()
}
