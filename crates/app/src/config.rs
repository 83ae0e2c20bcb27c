use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::args::Args;

pub const DEFAULT_DB_PATH: &str = "/var/lib/containerd/io.containerd.metadata.v1.bolt/meta.db";
pub const DEFAULT_PORT: u16 = 8081;
const DEFAULT_LISTEN_IP: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

#[derive(Debug, Clone)]
pub struct Config {
    /// bolt file opened (read-only) on every request
    pub db_path: PathBuf,
    pub listen_addr: SocketAddr,
    pub log_level: tracing::Level,
}

/// Settings accepted from `--config`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    db_path: Option<PathBuf>,
    port: Option<u16>,
    listen_addr: Option<IpAddr>,
    log_level: Option<String>,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let log_level = match (args.log_level, file.log_level) {
            (Some(level), _) => level,
            (None, Some(raw)) => raw
                .parse()
                .map_err(|_| ConfigError::LogLevel(raw.clone()))?,
            (None, None) => tracing::Level::INFO,
        };

        let ip = args
            .listen_addr
            .or(file.listen_addr)
            .unwrap_or(DEFAULT_LISTEN_IP);
        let port = args.port.or(file.port).unwrap_or(DEFAULT_PORT);

        Ok(Config {
            db_path: args
                .db_path
                .or(file.db_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            listen_addr: SocketAddr::new(ip, port),
            log_level,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid log level: {0}")]
    LogLevel(String),
}
