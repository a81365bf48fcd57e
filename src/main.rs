mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use gallery_core::AppConfig;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let mut config = AppConfig::from_toml_str(&config_str)?;

    if let Ok(v) = std::env::var("GLOWFIC_BASE_URL") {
        if !v.trim().is_empty() {
            config.site.base_url = v.trim().to_string();
        }
    }

    match cli.command {
        Commands::Galleries => commands::browse::galleries(config).await?,
        Commands::Icons { gallery } => commands::browse::icons(config, &gallery).await?,
        Commands::Fetch { path } => commands::browse::fetch(config, &path).await?,
        Commands::Upload {
            gallery,
            files,
            keyword,
            credit,
            icon_url,
        } => {
            commands::upload::run(config, gallery, files, keyword, credit, icon_url).await?;
        }
        Commands::Resize { input, output } => commands::resize::run(&config, &input, &output)?,
    }

    Ok(())
}
