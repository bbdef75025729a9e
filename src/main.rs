use clap::Parser;
use dotenvy::dotenv;
use tracing::info;

use addon_groups::bootstrap::app_context::AppContext;
use addon_groups::bootstrap::config::Config;
use addon_groups::presentation::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "addon_groups=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = Config::from_env()?;
    cli.apply_overrides(&mut cfg);
    info!(?cfg, "Starting addon-groups");

    let ctx = AppContext::from_config(cfg)?;
    cli::run(cli, &ctx).await
}
