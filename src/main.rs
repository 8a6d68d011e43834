mod cli;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, UserCommands};
use teledeck::{config::Config, Teledeck};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("teledeck=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = cli.database_url {
        config.database_url = Some(url);
    }

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            let deck = Teledeck::open(config).await?;
            teledeck::server::serve(Arc::new(deck)).await?;
        }
        Commands::Import { dir, channel } => {
            let deck = Teledeck::open(config).await?;
            let report = deck.import_directory(&dir, channel.as_deref()).await?;
            println!(
                "scanned {}, imported {}, already known {}, unsupported {}",
                report.scanned, report.imported, report.already_known, report.unsupported
            );
        }
        Commands::User { command: UserCommands::Add { email, password } } => {
            let deck = Teledeck::open(config).await?;
            let user = deck.register(&email, &password).await?;
            println!("created user {} ({})", user.email, user.id);
        }
        Commands::Stats => {
            let deck = Teledeck::open(config).await?;
            println!("{}", serde_json::to_string_pretty(&deck.stats().await?)?);
        }
        Commands::Vacuum => {
            let deck = Teledeck::open(config).await?;
            deck.database().vacuum().await?;
            println!("vacuum complete");
        }
    }
    Ok(())
}
