mod args;
mod config;
mod http_server;
mod process;
mod state;

use clap::Parser;

use args::Args;
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::from_args(args)?;
    process::run(config).await
}
