//! Mango dashboard API.
//!
//! Reads its settings from the environment (and a local `.env`), serves
//! the dashboard routes, and refreshes cached sessions in the background
//! until Ctrl-C.

use mango::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), MangoError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,mango=debug")),
        )
        .init();

    let config = MangoConfig::from_env()?;
    let store = Arc::new(JsonFileStore::open(&config.session_file).await?);
    let client = Arc::new(DiscordClient::new(config.discord.clone())?);

    let server = MangoServerBuilder::new()
        .config(&config)?
        .build(store, client)
        .await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
}
