//! Responder: turns one chat message into one reply via two provider tiers.
//!
//! ```text
//! START ─▶ empty? ──yes──▶ EmptyInput
//!            │no
//!            ▼
//!      primary configured? ──yes──▶ complete ──ok──▶ Primary
//!            │no                       │err (logged)
//!            ▼                         ▼
//!      fallback: load once, generate ──ok──▶ Fallback
//!                                   └─err (logged)──▶ Apology
//! ```
//!
//! No error escapes [`Responder::respond`]; every path ends in an [`Outcome`].
//! Tiers are tried once each, in order, with no retry.

use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use crate::llm::providers::{HfInferenceLoader, OpenAiCompatibleProvider};
use crate::llm::{CompletionProvider, GeneratorLoader, ProviderError, TextGenerator};

/// Reply to empty or whitespace-only input.
pub const EMPTY_INPUT_REPLY: &str = "Send me some text and I'll reply.";

/// Reply when neither tier produced text.
pub const APOLOGY_REPLY: &str =
    "Sorry, I couldn't generate a reply (both the primary and fallback providers failed).";

/// Terminal state of one handling cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    EmptyInput,
    Primary(String),
    Fallback(String),
    Apology,
}

impl Outcome {
    /// Text to send back to the chat.
    pub fn into_text(self) -> String {
        match self {
            Outcome::EmptyInput => EMPTY_INPUT_REPLY.to_string(),
            Outcome::Primary(text) | Outcome::Fallback(text) => text,
            Outcome::Apology => APOLOGY_REPLY.to_string(),
        }
    }

    /// Short label for log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::EmptyInput => "empty_input",
            Outcome::Primary(_) => "primary",
            Outcome::Fallback(_) => "fallback",
            Outcome::Apology => "apology",
        }
    }
}

// ── Fallback tier ─────────────────────────────────────────────────────────────

/// Owns the loader and the once-initialised generator handle.
///
/// `OnceCell::get_or_try_init` serialises concurrent first use: one caller
/// runs `load`, the rest wait for it. A failed load leaves the cell empty so
/// the next fallback attempts it again.
struct FallbackTier<L: GeneratorLoader> {
    loader: L,
    handle: OnceCell<L::Generator>,
}

impl<L: GeneratorLoader> FallbackTier<L> {
    async fn generate(&self, text: &str) -> Result<Option<String>, ProviderError> {
        let generator = self.handle.get_or_try_init(|| self.loader.load()).await?;
        generator.generate(text).await
    }
}

// ── Responder ─────────────────────────────────────────────────────────────────

pub struct Responder<P = OpenAiCompatibleProvider, L: GeneratorLoader = HfInferenceLoader> {
    primary: Option<P>,
    fallback: FallbackTier<L>,
}

impl<P, L> Responder<P, L>
where
    P: CompletionProvider,
    L: GeneratorLoader,
{
    /// `primary` is `None` when no primary credential is configured; the
    /// fallback loader is not invoked until a message needs it.
    pub fn new(primary: Option<P>, fallback: L) -> Self {
        Self {
            primary,
            fallback: FallbackTier { loader: fallback, handle: OnceCell::new() },
        }
    }

    pub fn primary_enabled(&self) -> bool {
        self.primary.is_some()
    }

    /// Whether the fallback generator has been loaded.
    pub fn fallback_loaded(&self) -> bool {
        self.fallback.handle.initialized()
    }

    /// Produce the reply outcome for `text`.
    pub async fn respond(&self, text: &str) -> Outcome {
        if text.trim().is_empty() {
            debug!("empty input, no provider contacted");
            return Outcome::EmptyInput;
        }

        if let Some(primary) = &self.primary {
            match primary.complete(text).await {
                Ok(content) => return Outcome::Primary(content.trim().to_string()),
                Err(e) => error!(error = %e, "primary provider failed, trying fallback"),
            }
        }

        match self.fallback.generate(text).await {
            Ok(generated) => {
                info!(primary_enabled = self.primary_enabled(), "replied from fallback provider");
                Outcome::Fallback(generated.unwrap_or_default())
            }
            Err(e) => {
                error!(error = %e, "fallback provider failed");
                Outcome::Apology
            }
        }
    }
}
