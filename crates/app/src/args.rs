use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "boltscope", version, about = "Browse a bbolt database over HTTP")]
pub struct Args {
    /// Bolt database to inspect
    #[arg(value_name = "DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Port to serve on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    pub listen_addr: Option<IpAddr>,

    /// Default log level, overridden per target by RUST_LOG
    #[arg(long)]
    pub log_level: Option<tracing::Level>,

    /// Optional TOML file providing the same settings; flags take precedence
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}
