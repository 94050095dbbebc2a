use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

const CONFIG_TOML: &str = "registrator.toml";
const CONFIG_JSON: &str = "registrator.json";
const ENV_PREFIX: &str = "REGISTRATOR_";

/// Payload shape expected by the service directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// `POST {url}/api/entrypoints/{app}/{platform}/backend/{service}/register-server`
    #[default]
    Path,
    /// `POST {url}/pub?topic=register_server`
    Topic,
}

/// Command-line flags.  Only flags that were actually given override the
/// file and environment layers.
#[derive(Parser, Debug, Default, Serialize)]
#[command(name = "registrator", about, disable_version_flag = true)]
pub struct Cli {
    /// Enable debug logging.
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub verbose: bool,

    /// Print the version banner and exit.
    #[arg(long)]
    #[serde(skip)]
    pub version: bool,

    /// Base URL of the service directory.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// IP address advertised for the registered services.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Registration payload shape.
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wire_format: Option<WireFormat>,

    /// Docker socket path (defaults to the local daemon).
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_socket: Option<String>,

    /// Register containers that are already running at startup.
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub register_existing: bool,

    /// Extra TOML configuration file.
    #[arg(long)]
    #[serde(skip)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub url: String,
    pub address: String,
    pub verbose: bool,
    pub wire_format: WireFormat,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_socket: Option<String>,
    pub register_existing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: String::new(),
            address: String::new(),
            verbose: false,
            wire_format: WireFormat::default(),
            request_timeout_secs: 10,
            connect_timeout_secs: 5,
            docker_socket: None,
            register_existing: false,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let config = Self::extract(cli)
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
        config.validate()
    }

    /// Merges defaults, config files, `REGISTRATOR_*` variables and flags.
    pub fn extract(cli: &Cli) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_TOML))
            .merge(Json::file(CONFIG_JSON));
        if let Some(path) = &cli.config {
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(cli))
            .extract()
    }

    fn validate(mut self) -> anyhow::Result<Self> {
        self.url = self.url.trim().trim_end_matches('/').to_string();
        if self.url.is_empty() {
            anyhow::bail!("No registration url configured (use --url or {}URL)", ENV_PREFIX);
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than zero");
        }
        Ok(self)
    }
}

/// Version banner printed by `--version` and logged at startup.
pub fn version_banner() -> String {
    format!(
        "{} {}\nBuild date: {}\nGitCommit: {}\nGitBranch: {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        option_env!("BUILD_DATE").unwrap_or("unknown"),
        option_env!("GIT_COMMIT").unwrap_or("unknown"),
        option_env!("GIT_BRANCH").unwrap_or("unknown"),
    )
}
