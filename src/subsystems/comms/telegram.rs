//! Telegram comms channel. Receives messages through a teloxide dispatcher,
//! hands them to the [`Relay`], and replies to the originating chat.
//!
//! Delivery is either long polling or, with the `webhook` feature, a webhook
//! served by axum on the configured listen address. Both modes share the
//! same handler tree; only the update listener differs.

use std::sync::Arc;

use teloxide::RequestError;
use teloxide::dispatching::DefaultKey;
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Delivery;
use crate::error::AppError;
use crate::relay::{IncomingMessage, Relay};

// ── Constants ────────────────────────────────────────────────────────────────

/// Telegram has a 4096 character limit per message.
/// We chunk at 4000 to be safe.
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// Sent instead of an empty reply, which Telegram rejects.
pub const EMPTY_REPLY_PLACEHOLDER: &str = "(empty response)";

/// Bot username resolved via `getMe`, used to match `/cmd@username`.
#[derive(Clone)]
struct BotUsername(Arc<str>);

type RelayDispatcher = Dispatcher<Bot, RequestError, DefaultKey>;

// ── TelegramChannel ──────────────────────────────────────────────────────────

pub struct TelegramChannel {
    token: String,
    delivery: Delivery,
    relay: Arc<Relay>,
}

impl TelegramChannel {
    pub fn new(token: impl Into<String>, delivery: Delivery, relay: Arc<Relay>) -> Self {
        Self { token: token.into(), delivery, relay }
    }

    /// Run until `shutdown` is cancelled or the dispatcher exits.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), AppError> {
        let bot = Bot::new(self.token);

        let me = bot
            .get_me()
            .await
            .map_err(|e| AppError::Comms(format!("getMe failed (is TELEGRAM_TOKEN valid?): {e}")))?;
        let username = BotUsername(Arc::from(me.username()));
        info!(bot = %username.0, "telegram channel starting");

        let handler = Update::filter_message().endpoint(on_message);
        let dispatcher = Dispatcher::builder(bot.clone(), handler)
            .dependencies(dptree::deps![self.relay, username])
            .build();

        match self.delivery {
            Delivery::Polling => run_polling(dispatcher, shutdown).await,
            Delivery::Webhook { public_base, url, listen } => {
                info!(%public_base, %listen, "using webhook delivery");
                webhook::run(bot, dispatcher, url, listen, shutdown).await
            }
        }
    }
}

async fn run_polling(mut dispatcher: RelayDispatcher, shutdown: CancellationToken) -> Result<(), AppError> {
    info!("WEBHOOK_URL not set, using long polling");
    tokio::select! {
        biased;

        _ = shutdown.cancelled() => {
            info!("shutdown signal received — closing telegram channel");
        }
        _ = dispatcher.dispatch() => {
            warn!("telegram dispatcher exited unexpectedly");
        }
    }
    Ok(())
}

#[cfg(feature = "webhook")]
mod webhook {
    use std::net::SocketAddr;

    use teloxide::prelude::*;
    use teloxide::update_listeners::webhooks::{self, Options};
    use teloxide::update_listeners::UpdateListener;
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;
    use tracing::{error, info, warn};

    use super::RelayDispatcher;
    use crate::error::AppError;
    use crate::subsystems::comms::health;

    /// Register the webhook, serve it (plus `/health`) with axum, and feed
    /// the dispatcher from it.
    pub(super) async fn run(
        bot: Bot,
        mut dispatcher: RelayDispatcher,
        url: reqwest::Url,
        listen: SocketAddr,
        shutdown: CancellationToken,
    ) -> Result<(), AppError> {
        let tcp_listener = TcpListener::bind(listen)
            .await
            .map_err(|e| AppError::Comms(format!("webhook bind failed on {listen}: {e}")))?;

        let (mut update_listener, stop_flag, router) =
            webhooks::axum_to_router(bot, Options::new(listen, url))
                .await
                .map_err(|e| AppError::Comms(format!("setWebhook failed: {e}")))?;
        let stop_token = update_listener.stop_token();

        let app = router.merge(health::router());
        let server_stop = stop_token.clone();
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(tcp_listener, app).with_graceful_shutdown(stop_flag).await {
                error!(error = %e, "webhook server error");
                server_stop.stop();
            }
        });

        info!(%listen, "webhook listening");

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("shutdown signal received — closing telegram channel");
            }
            _ = dispatcher.dispatch_with_listener(
                update_listener,
                LoggingErrorHandler::with_custom_text("webhook update listener error"),
            ) => {
                warn!("telegram dispatcher exited unexpectedly");
            }
        }

        stop_token.stop();
        if let Err(e) = server.await {
            warn!(error = %e, "webhook server task did not exit cleanly");
        }
        Ok(())
    }
}

#[cfg(not(feature = "webhook"))]
mod webhook {
    use std::net::SocketAddr;

    use teloxide::prelude::*;
    use tokio_util::sync::CancellationToken;

    use super::RelayDispatcher;
    use crate::error::AppError;

    pub(super) async fn run(
        _bot: Bot,
        _dispatcher: RelayDispatcher,
        _url: reqwest::Url,
        _listen: SocketAddr,
        _shutdown: CancellationToken,
    ) -> Result<(), AppError> {
        Err(AppError::Config("WEBHOOK_URL is set but this build lacks the `webhook` feature".into()))
    }
}

// ── Handler ──────────────────────────────────────────────────────────────────

async fn on_message(bot: Bot, msg: Message, relay: Arc<Relay>, username: BotUsername) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    debug!(
        chat_id = msg.chat.id.0,
        from = ?msg.from.as_ref().and_then(|u| u.username.as_ref()),
        "telegram received message"
    );

    let incoming = IncomingMessage::new(msg.chat.id.0, text);
    if let Some(reply) = relay.handle(&incoming, &username.0).await {
        for chunk in split_message(&reply.text, MAX_MESSAGE_LENGTH) {
            if let Err(e) = bot.send_message(msg.chat.id, chunk).await {
                warn!(chat_id = msg.chat.id.0, "failed to send telegram reply: {e}");
                break;
            }
        }
    }
    Ok(())
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Blank text yields the placeholder so the chat always gets a message.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return vec![EMPTY_REPLY_PLACEHOLDER.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(max_chars.max(1)).map(|c| c.iter().collect()).collect()
}
