//! Relay bot entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config (fatal if TELEGRAM_TOKEN is missing)
//!   3. Init logger once
//!   4. Build providers and the relay
//!   5. Spawn Ctrl-C → shutdown signal watcher
//!   6. Run the Telegram channel (polling or webhook) until shutdown

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use relay_bot::config::{self, Delivery};
use relay_bot::error::AppError;
use relay_bot::llm::providers;
use relay_bot::logger;
use relay_bot::relay::Relay;
use relay_bot::responder::Responder;
use relay_bot::subsystems::comms;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let config = config::load()?;

    // RUST_LOG, when set, replaces the configured level.
    logger::init(config.log_level)?;

    let primary = providers::build_primary(&config).map_err(|e| AppError::Config(e.to_string()))?;
    let fallback = providers::build_fallback(&config);

    info!(
        primary = primary.as_ref().map(|p| p.model()).unwrap_or("disabled"),
        fallback = fallback.model(),
        delivery = match config.delivery {
            Delivery::Polling => "polling",
            Delivery::Webhook { .. } => "webhook",
        },
        "config loaded"
    );

    let relay = Arc::new(Relay::new(Responder::new(primary, fallback)));

    // Ctrl-C cancels the shared shutdown token.
    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    comms::run(&config, relay, shutdown).await?;

    info!("relay stopped");
    Ok(())
}
