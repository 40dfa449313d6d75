//! Telegram chat relay: each text message is answered by a primary LLM
//! completion service, with a text-generation fallback when it fails.
//!
//! The binary entry point is `src/main.rs`; the library exposes the pieces
//! for integration tests.

pub mod config;
pub mod error;
pub mod llm;
pub mod logger;
pub mod relay;
pub mod responder;
pub mod router;
pub mod subsystems;
