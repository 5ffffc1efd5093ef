//! Handler builder functions for common checks.
//!
//! Each function returns a named [`FnHandler`] with its check already set;
//! attach operations with [`FnHandler::handle_message`] and friends.
//!
//! ```rust,ignore
//! use pipebot_framework::{Router, on_command, on_callback_prefix};
//!
//! let router = Router::new()
//!     .with(on_command("/start").handle_message(start))
//!     .with(on_callback_prefix("menu:").handle_callback(menu));
//! ```

use crate::handler::FnHandler;

/// Matches messages whose command is exactly `command`, marker included.
///
/// Callbacks never match: a callback's embedded message is the bot's own
/// reply and its command is not the user's.
pub fn on_command(command: impl Into<String>) -> FnHandler {
    let command = command.into();
    FnHandler::new()
        .named(command.clone())
        .check(move |pipe| !pipe.is_callback() && pipe.command() == command)
}

/// Matches messages carrying any of `commands`.
pub fn on_commands<I, S>(commands: I) -> FnHandler
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let commands: Vec<String> = commands.into_iter().map(Into::into).collect();
    FnHandler::new()
        .named(commands.join("|"))
        .check(move |pipe| {
            !pipe.is_callback() && commands.iter().any(|c| c.as_str() == pipe.command())
        })
}

/// Matches callbacks whose data starts with `prefix`.
pub fn on_callback_prefix(prefix: impl Into<String>) -> FnHandler {
    let prefix = prefix.into();
    FnHandler::new()
        .named(format!("callback:{prefix}"))
        .check(move |pipe| {
            pipe.callback_data()
                .is_some_and(|data| data.starts_with(prefix.as_str()))
        })
}

/// Matches plain-text messages, i.e. anything that is not a command.
pub fn on_text() -> FnHandler {
    FnHandler::new()
        .named("text")
        .check(|pipe| !pipe.is_callback() && pipe.command().is_empty())
}

/// Matches every event. Register last as a fallback.
pub fn on_any() -> FnHandler {
    FnHandler::new().named("any")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use pipebot_core::{Callback, Chat, Message, Pipe, User};
    use pipebot_transport::MemoryTransport;

    fn message(text: &str) -> Message {
        Message::new(1, User::new(2, "Ann"), Chat::private(2), text)
    }

    fn pipe(text: &str) -> Pipe {
        let (transport, _injector) = MemoryTransport::new();
        Pipe::new(message(text), transport)
    }

    fn callback(data: &str) -> Pipe {
        let (transport, _injector) = MemoryTransport::new();
        let cb = Callback::new("c", User::new(3, "Bob"), message("/menu"), data);
        Pipe::new(cb, transport)
    }

    #[test]
    fn test_on_command() {
        let handler = on_command("/start");
        assert_eq!(handler.name(), "/start");
        assert!(handler.test(&pipe("/start")));
        assert!(handler.test(&pipe("/start@pipebot now")));
        assert!(!handler.test(&pipe("/stop")));
        assert!(!handler.test(&pipe("start")));
    }

    #[test]
    fn test_on_command_ignores_callbacks() {
        assert!(!on_command("/menu").test(&callback("x")));
    }

    #[test]
    fn test_on_commands() {
        let handler = on_commands(["/help", "/h"]);
        assert_eq!(handler.name(), "/help|/h");
        assert!(handler.test(&pipe("/h")));
        assert!(handler.test(&pipe("/help me")));
        assert!(!handler.test(&pipe("/hello")));
    }

    #[test]
    fn test_on_callback_prefix() {
        let handler = on_callback_prefix("menu:");
        assert!(handler.test(&callback("menu:open")));
        assert!(!handler.test(&callback("other")));
        assert!(!handler.test(&pipe("menu:open")));
    }

    #[test]
    fn test_on_text_and_any() {
        assert!(on_text().test(&pipe("just chatting")));
        assert!(!on_text().test(&pipe("/cmd")));
        assert!(on_any().test(&pipe("/cmd")));
        assert!(on_any().test(&callback("x")));
    }
}
