/*!
 * Configuration types for the enclave client
 */

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::error::{EnclaveError, Result};
use crate::partition::{
    PartitionConnection, PartitionConnections, PartitionError, PartitionServices,
};

/// Connection settings for one enclave
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// gRPC endpoint of the API container
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// gRPC-Web proxy in front of the API container; selects the gRPC-Web transport when set
    #[serde(default)]
    pub grpc_web_proxy_url: Option<String>,

    /// Enclave the API container belongs to
    #[serde(default)]
    pub enclave_id: String,

    /// Where the enclave data directory is mounted on this host
    #[serde(default = "default_enclave_data_dirpath")]
    pub enclave_data_dirpath: String,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,

    /// Engine that creates and destroys enclaves
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            grpc_web_proxy_url: None,
            enclave_id: String::new(),
            enclave_data_dirpath: default_enclave_data_dirpath(),
            log_level: LogLevel::default(),
            log_file: None,
            verbose: false,
            engine: EngineConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            EnclaveError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: ClientConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| EnclaveError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check the settings needed to build a transport
    pub fn validate(&self) -> Result<()> {
        if self.enclave_id.trim().is_empty() {
            return Err(EnclaveError::Config("enclave_id must not be empty".to_string()));
        }
        check_http_url("endpoint", &self.endpoint)?;
        if let Some(ref proxy) = self.grpc_web_proxy_url {
            check_http_url("grpc_web_proxy_url", proxy)?;
        }
        Ok(())
    }
}

/// Connection settings for the engine, read from the `[engine]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// gRPC endpoint of the engine
    #[serde(default = "default_engine_endpoint")]
    pub endpoint: String,

    /// gRPC-Web proxy in front of the engine; selects gRPC-Web for the engine and its enclaves
    #[serde(default)]
    pub grpc_web_proxy_url: Option<String>,

    /// Host that enclave API container ports are published on
    #[serde(default = "default_api_container_host")]
    pub api_container_host: String,

    /// Engine version this client speaks; only major.minor must match
    #[serde(default = "default_engine_version")]
    pub expected_engine_version: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: default_engine_endpoint(),
            grpc_web_proxy_url: None,
            api_container_host: default_api_container_host(),
            expected_engine_version: default_engine_version(),
        }
    }
}

impl EngineConfig {
    /// Check the settings needed to reach the engine
    pub fn validate(&self) -> Result<()> {
        check_http_url("engine.endpoint", &self.endpoint)?;
        if let Some(ref proxy) = self.grpc_web_proxy_url {
            check_http_url("engine.grpc_web_proxy_url", proxy)?;
        }
        if self.api_container_host.trim().is_empty() {
            return Err(EnclaveError::Config(
                "engine.api_container_host must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_http_url(field: &str, url: &str) -> Result<()> {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"));
    match rest {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(EnclaveError::Config(format!(
            "{} must be an http:// or https:// URL, got '{}'",
            field, url
        ))),
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:7443".to_string()
}

fn default_engine_endpoint() -> String {
    format!("http://127.0.0.1:{}", crate::engine::DEFAULT_ENGINE_GRPC_PORT)
}

fn default_api_container_host() -> String {
    "127.0.0.1".to_string()
}

fn default_engine_version() -> String {
    crate::engine::ENGINE_API_VERSION.to_string()
}

fn default_enclave_data_dirpath() -> String {
    "/kurtosis-enclave-data".to_string()
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Desired network topology, as written in a TOML file
///
/// ```toml
/// default_packet_loss_percentage = 0.0
///
/// [partitions]
/// frontend = ["web"]
/// backend = ["db", "cache"]
///
/// [[connections]]
/// between = ["frontend", "backend"]
/// packet_loss_percentage = 100.0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Partition ID -> service IDs
    #[serde(default)]
    pub partitions: BTreeMap<String, Vec<String>>,

    /// Explicit pairwise connections
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,

    /// Loss applied to every pair without an explicit connection; required
    #[serde(default)]
    pub default_packet_loss_percentage: Option<f32>,
}

/// One `[[connections]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub between: [String; 2],
    pub packet_loss_percentage: f32,
}

impl TopologyConfig {
    /// Load a topology from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            EnclaveError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: TopologyConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Convert to partition model inputs
    ///
    /// A missing default loss comes back as `None` so the partition model
    /// reports it; bad loss values and conflicting pairs fail here.
    pub fn into_parts(
        self,
    ) -> std::result::Result<
        (
            PartitionServices,
            PartitionConnections,
            Option<PartitionConnection>,
        ),
        PartitionError,
    > {
        let services: PartitionServices = self
            .partitions
            .into_iter()
            .map(|(id, svcs)| (id, svcs.into_iter().collect::<BTreeSet<_>>()))
            .collect();

        let mut connections = PartitionConnections::new();
        for conn in self.connections {
            let [a, b] = conn.between;
            connections.insert(
                a,
                b,
                PartitionConnection::with_packet_loss(conn.packet_loss_percentage)?,
            )?;
        }

        let default_connection = self
            .default_packet_loss_percentage
            .map(PartitionConnection::with_packet_loss)
            .transpose()?;

        Ok((services, connections, default_connection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_client_config_defaults() {
        let config: ClientConfig = toml::from_str("enclave_id = \"e1\"").unwrap();
        assert_eq!(config.endpoint, "http://127.0.0.1:7443");
        assert_eq!(config.enclave_data_dirpath, "/kurtosis-enclave-data");
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.grpc_web_proxy_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_client_config_validation() {
        let config = ClientConfig::default();
        assert!(config.validate().is_err(), "empty enclave id");

        let config = ClientConfig {
            enclave_id: "e1".to_string(),
            endpoint: "127.0.0.1:7443".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err(), "missing scheme");

        let config = ClientConfig {
            enclave_id: "e1".to_string(),
            grpc_web_proxy_url: Some("https://".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err(), "empty proxy host");
    }

    #[test]
    fn test_client_config_file_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let config = ClientConfig {
            enclave_id: "e1".to_string(),
            grpc_web_proxy_url: Some("http://localhost:8080".to_string()),
            log_level: LogLevel::Debug,
            ..Default::default()
        };
        config.to_file(file.path()).unwrap();

        let loaded = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_config_file() {
        let err = ClientConfig::from_file(Path::new("/nonexistent/enclave.toml")).unwrap_err();
        assert!(matches!(err, EnclaveError::Config(_)));
    }

    #[test]
    fn test_engine_table() {
        let config: ClientConfig = toml::from_str(
            r#"
            enclave_id = "e1"

            [engine]
            grpc_web_proxy_url = "http://localhost:9711"
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.endpoint, "http://127.0.0.1:9710");
        assert_eq!(
            config.engine.grpc_web_proxy_url.as_deref(),
            Some("http://localhost:9711")
        );
        assert_eq!(config.engine.api_container_host, "127.0.0.1");
        assert!(config.engine.validate().is_ok());

        let engine = EngineConfig {
            api_container_host: " ".to_string(),
            ..Default::default()
        };
        assert!(engine.validate().is_err());
    }

    #[test]
    fn test_topology_parse() {
        let toml_str = r#"
            default_packet_loss_percentage = 0.0

            [partitions]
            a = ["svc1"]
            b = ["svc2", "svc3"]

            [[connections]]
            between = ["b", "a"]
            packet_loss_percentage = 100.0
        "#;
        let topology: TopologyConfig = toml::from_str(toml_str).unwrap();
        let (services, connections, default) = topology.into_parts().unwrap();

        assert_eq!(services.len(), 2);
        assert_eq!(services["b"].len(), 2);
        assert!(connections.get("a", "b").unwrap().is_blocked());
        assert_eq!(default, Some(PartitionConnection::unblocked()));
    }

    #[test]
    fn test_topology_without_default() {
        let topology: TopologyConfig = toml::from_str("[partitions]\na = [\"x\"]").unwrap();
        let (_, _, default) = topology.into_parts().unwrap();
        assert!(default.is_none());
    }

    #[test]
    fn test_topology_bad_loss() {
        let toml_str = r#"
            default_packet_loss_percentage = 250.0
        "#;
        let topology: TopologyConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            topology.into_parts().unwrap_err(),
            PartitionError::PacketLossOutOfRange { value: 250.0 }
        );
    }
}
