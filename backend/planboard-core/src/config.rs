// src/config.rs
use clap::Parser;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "PLANBOARD_";

/// Command-line overrides for the environment configuration.
#[derive(Parser, Debug, Default)]
#[command(name = "planboard", about = "Planning board backend for half-day task slots")]
pub struct Cli {
    /// Address to bind, e.g. 0.0.0.0
    #[arg(long)]
    pub host: Option<String>,
    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    // Server Configuration
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    // tracing-subscriber filter directive, used when RUST_LOG is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    // TLS is enabled only when both paths are set
    #[serde(default)]
    pub tls_cert_path: Option<String>,
    #[serde(default)]
    pub tls_key_path: Option<String>,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    3000
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        Self::from_vars(std::env::vars())
    }

    /// Reads `PLANBOARD_*` variables from an explicit list of key/value pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX).from_iter(vars)
    }

    pub fn with_cli_overrides(mut self, cli: &Cli) -> Self {
        if let Some(host) = &cli.host {
            self.server_host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server_port = port;
        }
        self
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => Some((cert.as_str(), key.as_str())),
            _ => None,
        }
    }
}
