use std::{io, path::{Path, PathBuf}, time::Duration};

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use serde_with::serde_as;
use tokio::fs;

pub const CONFIG_PATH: &str = "Config.toml";

#[derive(Parser, Debug)]
#[command(name = "incident-dashboard", version, about = "Payment services incident dashboard")]
pub struct Cli {
    /// Optional TOML file; missing is fine, malformed is not.
    #[arg(long, value_name = "PATH", default_value = CONFIG_PATH)]
    pub config: PathBuf,
    #[arg(long, help = "Interface to listen on [default: 0.0.0.0]")]
    pub host: Option<String>,
    #[arg(long, help = "Port to listen on [default: 8050]")]
    pub port: Option<u16>,
    #[arg(long, help = "Log at debug level unless RUST_LOG says otherwise")]
    pub debug: bool,
}

/// Loads `filename` (searched upward from the working directory) into the
/// process environment. A missing file is `Ok(None)`.
pub fn load_dotenv(filename: &str) -> Result<Option<PathBuf>, dotenvy::Error> {
    match dotenvy::from_filename(filename) {
        Ok(path) => Ok(Some(path)),
        Err(err) if err.not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Defaults, then the TOML file, then the process environment (with `.env`
/// already applied by [`load_dotenv`]), then command line flags.
pub async fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = read_file(&cli.config).await?;
    config.directus.apply_env(|key| std::env::var(key).ok())?;

    if let Some(host) = &cli.host {
        config.api.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.api.port = port;
    }

    Ok(config)
}

async fn read_file(path: &Path) -> anyhow::Result<Config> {
    match fs::read_to_string(path).await {
        Ok(contents) => toml::from_str(&contents).with_context(|| format!("invalid config file {}", path.display())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Config::default()),
        Err(err) => Err(err).with_context(|| format!("cannot read {}", path.display())),
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl ApiConfig {
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig { host: String::from("0.0.0.0"), port: 8050 }
    }
}

#[serde_as]
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DirectusConfig {
    pub url: String,
    pub token: String,
    pub collection: String,
    // loaded and reported, nothing polls on it
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub refresh_interval: Duration,
}

impl DirectusConfig {
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(url) = var("DIRECTUS_URL") {
            self.url = url;
        }
        if let Some(token) = var("API_TOKEN") {
            self.token = token;
        }
        if let Some(collection) = var("COLLECTION_NAME") {
            self.collection = collection;
        }
        if let Some(interval) = var("REFRESH_INTERVAL") {
            let secs: u64 = interval
                .trim()
                .parse()
                .with_context(|| format!("REFRESH_INTERVAL must be a number of seconds, got `{interval}`"))?;
            self.refresh_interval = Duration::from_secs(secs);
        }
        Ok(())
    }
}

impl Default for DirectusConfig {
    fn default() -> Self {
        DirectusConfig {
            url: String::from("https://directus.corefy.org"),
            token: String::from("your-api-token-here"),
            collection: String::from("hakaton_NAZVA_KOMANDI"),
            refresh_interval: Duration::from_secs(300),
        }
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub directus: DirectusConfig,
}
