//! Configuration module
//!
//! Handles loading and managing configuration. A single `AppConfig` is built
//! at startup (file, then environment overrides) and handed to the client,
//! the call log and the server explicitly.

mod env;
mod tokens;

pub use env::{print_env_help, EnvConfig};
pub use tokens::TokenReport;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::http::DEFAULT_TIMEOUT;
use crate::models::{Coordinates, Operation, Parameters};

/// Locations searched for a configuration file, in order
const CONFIG_LOCATIONS: &[&str] = &["./geobench.yaml", "./geobench.yml", "./geobench.json"];

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP service bind address
    pub server: ServerConfig,

    /// Upstream request timeout in seconds
    pub timeout_secs: u64,

    /// Skip TLS certificate verification for upstream calls
    pub accept_invalid_certs: bool,

    /// Append-only benchmark log
    pub log_path: PathBuf,

    /// Directory for rendered reports
    pub report_dir: PathBuf,

    /// Directory for stored suite runs
    pub results_dir: PathBuf,

    /// Maximum concurrent calls during a suite run
    pub max_concurrent: usize,

    /// Query parameter name carrying the access token
    pub token_param: String,

    /// Upstream services
    pub services: ServicesConfig,

    /// Suite test cases
    pub suite: SuiteConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            accept_invalid_certs: false,
            log_path: PathBuf::from("data/benchmarks/api_benchmark.jsonl"),
            report_dir: PathBuf::from("data/reports"),
            results_dir: PathBuf::from("data/results"),
            max_concurrent: 4,
            token_param: "token".to_string(),
            services: ServicesConfig::default(),
            suite: SuiteConfig::default(),
        }
    }
}

impl AppConfig {
    /// Find configuration file in standard locations, then the user config dir
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(PathBuf::from)
            .chain(user_config_path())
            .find(|path| path.exists())
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Resolve the effective configuration.
    ///
    /// An explicit path wins over `GEOBENCH_CONFIG`, which wins over the
    /// standard locations. Environment overrides are applied last.
    pub fn resolve(explicit: Option<&Path>, env: &EnvConfig) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env.config_file.as_ref().map(PathBuf::from))
            .or_else(Self::find);

        let mut config = match path {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };

        config.apply_env(env);
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(host) = &env.host {
            self.server.host = host.clone();
        }
        if let Some(port) = env.port {
            self.server.port = port;
        }
        if let Some(timeout) = env.timeout {
            self.timeout_secs = timeout;
        }
        if let Some(path) = &env.log_path {
            self.log_path = PathBuf::from(path);
        }
        if let Some(dir) = &env.report_dir {
            self.report_dir = PathBuf::from(dir);
        }

        for operation in Operation::all() {
            let service = self.services.get_mut(operation);
            if let Some(url) = env.service_url(operation) {
                service.base_url = Some(url.to_string());
            }
            if let Some(token) = env.service_token(operation) {
                service.token = Some(token.to_string());
            }
        }
    }

    /// Check values that would make every call fail
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        if self.max_concurrent == 0 {
            anyhow::bail!("max_concurrent must be greater than zero");
        }
        if self.token_param.trim().is_empty() {
            anyhow::bail!("token_param must not be empty");
        }
        for operation in Operation::all() {
            if let Some(url) = &self.services.get(operation).base_url {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    anyhow::bail!("Invalid base URL for {operation}: {url}");
                }
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Copy safe to print: tokens reduced to their masked preview
    pub fn masked(&self) -> Self {
        let mut config = self.clone();
        for operation in Operation::all() {
            let service = config.services.get_mut(operation);
            service.token = service.token.as_deref().map(tokens::mask_token);
        }
        config
    }

    /// Example configuration written by `config init`
    pub fn example() -> Self {
        let mut config = Self::default();
        config.services.thematic_statistics.base_url =
            Some("https://geo.example.org/thematic".to_string());
        config.services.routing.base_url = Some("https://geo.example.org/routing".to_string());
        config.services.geoid.base_url = Some("https://geo.example.org/geoid".to_string());
        config
    }
}

/// HTTP service bind address
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// One upstream service
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL; operation paths are appended to it
    pub base_url: Option<String>,

    /// Access token, sent as the configured token parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Upstream services, one per operation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub thematic_statistics: ServiceConfig,
    pub routing: ServiceConfig,
    pub geoid: ServiceConfig,
}

impl ServicesConfig {
    pub fn get(&self, operation: Operation) -> &ServiceConfig {
        match operation {
            Operation::ThematicStatistics => &self.thematic_statistics,
            Operation::Routing => &self.routing,
            Operation::Geoid => &self.geoid,
        }
    }

    pub fn get_mut(&mut self, operation: Operation) -> &mut ServiceConfig {
        match operation {
            Operation::ThematicStatistics => &mut self.thematic_statistics,
            Operation::Routing => &mut self.routing,
            Operation::Geoid => &mut self.geoid,
        }
    }

    /// Same base URL for every service
    #[cfg(test)]
    pub fn all_at(base_url: &str) -> Self {
        let service = ServiceConfig {
            base_url: Some(base_url.to_string()),
            token: None,
        };
        Self {
            thematic_statistics: service.clone(),
            routing: service.clone(),
            geoid: service,
        }
    }
}

/// A named test location
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedLocation {
    pub name: String,
    #[serde(flatten)]
    pub coordinates: Coordinates,
}

/// A named origin/destination pair
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedRoute {
    pub name: String,
    pub origin: Coordinates,
    pub destination: Coordinates,
}

/// Suite test cases
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Points used for thematic statistics and geoid calls
    pub locations: Vec<NamedLocation>,

    /// Routes used for routing calls
    pub routes: Vec<NamedRoute>,

    /// Extra parameters sent with every suite call
    pub parameters: Parameters,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        let location = |name: &str, lat, lng| NamedLocation {
            name: name.to_string(),
            coordinates: Coordinates::new(lat, lng),
        };

        Self {
            locations: vec![
                location("Bangalore, Karnataka", 12.9716, 77.5946),
                location("Delhi", 28.6139, 77.2090),
                location("Mumbai, Maharashtra", 19.0760, 72.8777),
                location("Kolkata, West Bengal", 22.5726, 88.3639),
                location("Chennai, Tamil Nadu", 13.0827, 80.2707),
            ],
            routes: vec![
                NamedRoute {
                    name: "Bangalore to Mysore (Karnataka)".to_string(),
                    origin: Coordinates::new(12.9716, 77.5946),
                    destination: Coordinates::new(12.2958, 76.6394),
                },
                NamedRoute {
                    name: "Delhi Central to Delhi North".to_string(),
                    origin: Coordinates::new(28.6139, 77.2090),
                    destination: Coordinates::new(28.7041, 77.1025),
                },
            ],
            parameters: Parameters::new(),
        }
    }
}

/// `~/.config/geobench/config.yaml` or the platform equivalent
fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("geobench").join("config.yaml"))
}

fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}
