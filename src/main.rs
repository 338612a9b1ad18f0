use anyhow::Context;
use clap::{Parser, Subcommand};

/// HTTP service for creating and looking up users.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API (the default).
    Serve,
    /// Apply pending database migrations and exit.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the environment may already be set.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = configuration::load_config().context("Cannot load configuration")?;
    let _guard = web_server::telemetry::init(&settings.app)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => web_server::run_server(settings).await,
        Commands::Migrate => {
            let database = web_server::connect_database(&settings).await?;
            database.run_migrations().await?;
            tracing::info!("Migrations applied");
            database
                .close(std::time::Duration::from_secs(settings.app.graceful_timeout))
                .await;
            Ok(())
        }
    }
}
