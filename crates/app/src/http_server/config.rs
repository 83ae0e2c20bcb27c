use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Config {
    // Listen address
    pub listen_addr: SocketAddr,
    // Database shown on the index page
    pub db_path: PathBuf,
    // log level for http tracing
    pub log_level: tracing::Level,
}

impl Config {
    pub fn new(listen_addr: SocketAddr, db_path: &Path, log_level: tracing::Level) -> Self {
        tracing::info!(
            "Creating HTTP server Config: listen_addr={}, db_path={}",
            listen_addr,
            db_path.display()
        );
        Self {
            listen_addr,
            db_path: db_path.to_path_buf(),
            log_level,
        }
    }
}
