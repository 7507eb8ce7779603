//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

use crate::models::Operation;
use crate::utils::LogLevel;

/// Environment variable prefix
const ENV_PREFIX: &str = "GEOBENCH";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Bind host from GEOBENCH_HOST
    pub host: Option<String>,
    /// Bind port from GEOBENCH_PORT
    pub port: Option<u16>,
    /// Timeout from GEOBENCH_TIMEOUT
    pub timeout: Option<u64>,
    /// Call log from GEOBENCH_LOG_PATH
    pub log_path: Option<String>,
    /// Report directory from GEOBENCH_REPORT_DIR
    pub report_dir: Option<String>,
    /// Config file from GEOBENCH_CONFIG
    pub config_file: Option<String>,
    /// Verbose from GEOBENCH_VERBOSE
    pub verbose: Option<bool>,
    /// Log level from GEOBENCH_LOG_LEVEL
    pub log_level: Option<LogLevel>,
    /// Base URLs from GEOBENCH_<SERVICE>_URL
    pub service_urls: Vec<(Operation, String)>,
    /// Tokens from GEOBENCH_<SERVICE>_TOKEN
    pub service_tokens: Vec<(Operation, String)>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        let mut service_urls = Vec::new();
        let mut service_tokens = Vec::new();

        for operation in Operation::all() {
            if let Some(url) = get_env(&service_var(operation, "URL")) {
                service_urls.push((operation, url));
            }
            if let Some(token) = get_env(&service_var(operation, "TOKEN")) {
                service_tokens.push((operation, token));
            }
        }

        Self {
            host: get_env("HOST"),
            port: get_env_parse("PORT"),
            timeout: get_env_parse("TIMEOUT"),
            log_path: get_env("LOG_PATH"),
            report_dir: get_env("REPORT_DIR"),
            config_file: get_env("CONFIG"),
            verbose: get_env_bool("VERBOSE"),
            log_level: get_env("LOG_LEVEL").and_then(|v| LogLevel::from_str(&v)),
            service_urls,
            service_tokens,
        }
    }

    pub fn service_url(&self, operation: Operation) -> Option<&str> {
        lookup(&self.service_urls, operation)
    }

    pub fn service_token(&self, operation: Operation) -> Option<&str> {
        lookup(&self.service_tokens, operation)
    }

    /// Print current environment configuration, tokens masked
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {ENV_PREFIX}_HOST:        {:?}", self.host);
        println!("  {ENV_PREFIX}_PORT:        {:?}", self.port);
        println!("  {ENV_PREFIX}_TIMEOUT:     {:?}", self.timeout);
        println!("  {ENV_PREFIX}_LOG_PATH:    {:?}", self.log_path);
        println!("  {ENV_PREFIX}_REPORT_DIR:  {:?}", self.report_dir);
        println!("  {ENV_PREFIX}_CONFIG:      {:?}", self.config_file);
        println!("  {ENV_PREFIX}_VERBOSE:     {:?}", self.verbose);
        println!("  {ENV_PREFIX}_LOG_LEVEL:   {:?}", self.log_level);
        for operation in Operation::all() {
            println!(
                "  {:<36} {:?}",
                format!("{}:", service_var(operation, "URL")),
                self.service_url(operation)
            );
            println!(
                "  {:<36} {}",
                format!("{}:", service_var(operation, "TOKEN")),
                if self.service_token(operation).is_some() { "set" } else { "not set" }
            );
        }
    }
}

fn lookup(pairs: &[(Operation, String)], operation: Operation) -> Option<&str> {
    pairs
        .iter()
        .find(|(op, _)| *op == operation)
        .map(|(_, v)| v.as_str())
}

/// Variable name suffix for a service setting, e.g. `ROUTING_TOKEN`
fn service_var(operation: Operation, setting: &str) -> String {
    format!(
        "{ENV_PREFIX}_{}_{setting}",
        operation.name().to_uppercase()
    )
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    let key = if name.starts_with(ENV_PREFIX) {
        name.to_string()
    } else {
        format!("{ENV_PREFIX}_{name}")
    };
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Print all GEOBENCH environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_HOST          Bind host for `serve`");
    println!("  {ENV_PREFIX}_PORT          Bind port for `serve`");
    println!("  {ENV_PREFIX}_TIMEOUT       Upstream request timeout in seconds");
    println!("  {ENV_PREFIX}_LOG_PATH      Benchmark call log (JSON lines)");
    println!("  {ENV_PREFIX}_REPORT_DIR    Directory for generated reports");
    println!("  {ENV_PREFIX}_CONFIG        Path to configuration file");
    println!("  {ENV_PREFIX}_VERBOSE       Enable verbose output (true/false)");
    println!("  {ENV_PREFIX}_LOG_LEVEL     trace, debug, info, warn or error");
    for operation in Operation::all() {
        println!(
            "  {:<25} Base URL of the {} service",
            service_var(operation, "URL"),
            operation.title()
        );
        println!(
            "  {:<25} Access token for the {} service",
            service_var(operation, "TOKEN"),
            operation.title()
        );
    }
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_GEOID_URL=https://geo.example.org/geoid");
    println!("  export {ENV_PREFIX}_GEOID_TOKEN=your_token_here");
    println!("  geobench serve");
}
