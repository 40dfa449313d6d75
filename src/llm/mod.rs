//! Provider abstraction for the two generation tiers.
//!
//! The primary tier is a [`CompletionProvider`]: one chat completion per
//! message. The fallback tier is split in two. A [`GeneratorLoader`]
//! produces a [`TextGenerator`] lazily, on first use, and the responder keeps
//! that generator for the rest of the process.
//!
//! Traits use native `async fn` (via `impl Future + Send`) so callers are
//! generic over the backend and tests can plug in scripted doubles without
//! `dyn` machinery.

pub mod providers;

use std::future::Future;

use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport failure: connect, TLS, timeout, client construction.
    #[error("provider request failed: {0}")]
    Request(String),
    /// The service answered with a non-success status.
    #[error("provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    /// The body did not have the expected shape.
    #[error("malformed provider response: {0}")]
    Malformed(String),
    /// The fallback generator could not be brought up.
    #[error("generator load failed: {0}")]
    Load(String),
}

// ── Traits ────────────────────────────────────────────────────────────────────

/// A metered chat-completion backend used as the first-choice generator.
pub trait CompletionProvider: Send + Sync {
    /// Send `content` as the sole user turn and return the completion text.
    fn complete(&self, content: &str) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

/// A loaded text-generation model.
pub trait TextGenerator: Send + Sync {
    /// Generate a continuation of `prompt`.
    ///
    /// `Ok(None)` means the service answered but omitted the generated text.
    fn generate(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<Option<String>, ProviderError>> + Send;
}

/// Brings up a [`TextGenerator`]. Called at most once per successful load.
pub trait GeneratorLoader: Send + Sync {
    type Generator: TextGenerator;

    fn load(&self) -> impl Future<Output = Result<Self::Generator, ProviderError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_display() {
        let e = ProviderError::Status { status: 429, message: "quota exceeded".into() };
        assert_eq!(e.to_string(), "provider returned HTTP 429: quota exceeded");
    }

    #[test]
    fn load_error_display() {
        let e = ProviderError::Load("model not found".into());
        assert!(e.to_string().contains("model not found"));
    }
}
