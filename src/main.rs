use anyhow::Result;
use autobuy_telegram::buyer::async_main;
use autobuy_telegram::config::Config;
use clap::Parser;
use dotenv::dotenv;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Sends token buys to a Telegram trading agent")]
struct Args {
    /// Poll the configured HTTP feed for tokens instead of reading them
    /// from the console.
    #[arg(long)]
    autobuy: bool,

    /// Path to the TOML config file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy("autobuy_telegram=info,grammers_session=warn");
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load(&args.config)?;
    async_main(config, args.autobuy).await
}
