//! The relay: command routing in front of the responder.
//!
//! One call to [`Relay::handle`] per incoming text message. The Telegram
//! adapter owns delivery; this type only decides what (if anything) to say.

use tracing::{debug, info};

use crate::llm::providers::{HfInferenceLoader, OpenAiCompatibleProvider};
use crate::llm::{CompletionProvider, GeneratorLoader};
use crate::responder::Responder;
use crate::router::{self, Route};

/// A text message from a chat, valid for one handling cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub text: String,
}

impl IncomingMessage {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self { chat_id, text: text.into() }
    }
}

/// Text to deliver back to the originating chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
}

impl Reply {
    fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

pub struct Relay<P = OpenAiCompatibleProvider, L: GeneratorLoader = HfInferenceLoader> {
    responder: Responder<P, L>,
}

impl<P, L> Relay<P, L>
where
    P: CompletionProvider,
    L: GeneratorLoader,
{
    pub fn new(responder: Responder<P, L>) -> Self {
        Self { responder }
    }

    pub fn responder(&self) -> &Responder<P, L> {
        &self.responder
    }

    /// Route `msg` and produce its reply. `None` means stay silent.
    pub async fn handle(&self, msg: &IncomingMessage, bot_username: &str) -> Option<Reply> {
        match router::route(&msg.text, bot_username) {
            Route::Command(cmd) => {
                debug!(chat_id = msg.chat_id, command = ?cmd, "command");
                Some(Reply::new(cmd.reply()))
            }
            Route::UnknownCommand => {
                debug!(chat_id = msg.chat_id, "ignoring unknown command");
                None
            }
            Route::Chat => {
                let outcome = self.responder.respond(&msg.text).await;
                info!(chat_id = msg.chat_id, outcome = outcome.label(), "message handled");
                Some(Reply::new(outcome.into_text()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ProviderError, TextGenerator};
    use crate::responder::{APOLOGY_REPLY, EMPTY_INPUT_REPLY};
    use crate::router::{HELP_REPLY, START_REPLY};

    struct Unreachable;

    impl CompletionProvider for Unreachable {
        async fn complete(&self, _content: &str) -> Result<String, ProviderError> {
            Err(ProviderError::Request("connection refused".into()))
        }
    }

    impl TextGenerator for Unreachable {
        async fn generate(&self, _prompt: &str) -> Result<Option<String>, ProviderError> {
            Err(ProviderError::Request("connection refused".into()))
        }
    }

    impl GeneratorLoader for Unreachable {
        type Generator = Unreachable;

        async fn load(&self) -> Result<Unreachable, ProviderError> {
            Err(ProviderError::Load("no network".into()))
        }
    }

    fn offline_relay() -> Relay<Unreachable, Unreachable> {
        Relay::new(Responder::new(Some(Unreachable), Unreachable))
    }

    #[tokio::test]
    async fn commands_reply_even_when_providers_are_down() {
        let relay = offline_relay();
        let start = relay.handle(&IncomingMessage::new(1, "/start"), "relaybot").await;
        let help = relay.handle(&IncomingMessage::new(1, "/help"), "relaybot").await;
        assert_eq!(start.unwrap().text, START_REPLY);
        assert_eq!(help.unwrap().text, HELP_REPLY);
        assert!(!relay.responder().fallback_loaded());
    }

    #[tokio::test]
    async fn unknown_command_gets_no_reply() {
        let relay = offline_relay();
        assert_eq!(relay.handle(&IncomingMessage::new(1, "/weather"), "relaybot").await, None);
    }

    #[tokio::test]
    async fn chat_text_goes_to_responder() {
        let relay = offline_relay();
        let reply = relay.handle(&IncomingMessage::new(7, "Hello"), "relaybot").await;
        assert_eq!(reply.unwrap().text, APOLOGY_REPLY);
    }

    #[tokio::test]
    async fn blank_text_gets_prompt() {
        let relay = offline_relay();
        let reply = relay.handle(&IncomingMessage::new(7, "   "), "relaybot").await;
        assert_eq!(reply.unwrap().text, EMPTY_INPUT_REPLY);
    }
}
