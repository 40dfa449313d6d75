//! Comms subsystem: the Telegram channel and, in webhook mode, the HTTP
//! surface it is served on.

#[cfg(feature = "webhook")]
pub mod health;
pub mod telegram;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::AppError;
use crate::relay::Relay;

/// Run the Telegram channel until `shutdown` is cancelled.
///
/// Returns an error only for startup failures (bad token, bind failure,
/// webhook registration); per-message failures are handled inside.
pub async fn run(config: &Config, relay: Arc<Relay>, shutdown: CancellationToken) -> Result<(), AppError> {
    telegram::TelegramChannel::new(config.telegram_token.clone(), config.delivery.clone(), relay)
        .run(shutdown)
        .await
}
