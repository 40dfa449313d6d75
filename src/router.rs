//! Command routing: `/start` and `/help` get fixed replies, plain text goes
//! to the responder, and any other `/command` is ignored.

use teloxide::utils::command::BotCommands;

/// Greeting sent for `/start`.
pub const START_REPLY: &str =
    "Hi, the bot is active. Write to me and I'll answer using OpenAI (or Hugging Face if that fails).";

/// Usage text sent for `/help`.
pub const HELP_REPLY: &str = "/start - start the bot\n/help - show this help";

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    #[command(description = "start the bot")]
    Start,
    #[command(description = "show this help")]
    Help,
}

impl Command {
    pub fn reply(&self) -> &'static str {
        match self {
            Command::Start => START_REPLY,
            Command::Help => HELP_REPLY,
        }
    }
}

/// Where an incoming text goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Command(Command),
    /// Starts with `/` but is not one of ours (or is addressed to another bot).
    UnknownCommand,
    Chat,
}

/// Classify `text`. `bot_username` resolves `/start@name` mentions.
///
/// Arguments after a command are ignored, so `/start now` is still `/start`.
pub fn route(text: &str, bot_username: &str) -> Route {
    if !text.starts_with('/') {
        return Route::Chat;
    }
    let head = text.split_whitespace().next().unwrap_or(text);
    match Command::parse(head, bot_username) {
        Ok(cmd) => Route::Command(cmd),
        Err(_) => Route::UnknownCommand,
    }
}
