//! Command token parsing.
//!
//! A command is the first whitespace-delimited token of a text that starts
//! with [`COMMAND_MARKER`]. The token may carry an addressee after
//! [`ADDRESSEE_SEPARATOR`], naming the bot the command is meant for:
//!
//! ```text
//! "/start@weather_bot berlin"
//!  ^^^^^^ ^^^^^^^^^^^
//!  command addressee
//! ```
//!
//! Parsing never fails; anything that is not a command yields empty parts.

/// Leading character that marks a command.
pub const COMMAND_MARKER: char = '/';

/// Separates a command name from its addressee inside the command token.
pub const ADDRESSEE_SEPARATOR: char = '@';

/// The `(command, addressee)` pair derived from a text.
///
/// The command keeps its marker (`"/start"`, not `"start"`). Both parts are
/// empty when the text is not a command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandDescriptor<'a> {
    pub command: &'a str,
    pub addressee: &'a str,
}

impl<'a> CommandDescriptor<'a> {
    /// Returns `true` if the text carried no command.
    pub fn is_empty(&self) -> bool {
        self.command.is_empty()
    }

    /// Returns `true` if the command names an addressee.
    pub fn is_addressed(&self) -> bool {
        !self.addressee.is_empty()
    }
}

/// Returns the leading command token, if `text` starts with the marker.
fn command_token(text: &str) -> Option<&str> {
    if !text.starts_with(COMMAND_MARKER) {
        return None;
    }
    text.split_whitespace().next()
}

/// Extracts the command and addressee from `text`.
pub fn parse_command(text: &str) -> CommandDescriptor<'_> {
    let Some(token) = command_token(text) else {
        return CommandDescriptor::default();
    };

    match token.split_once(ADDRESSEE_SEPARATOR) {
        Some((command, addressee)) => CommandDescriptor { command, addressee },
        None => CommandDescriptor {
            command: token,
            addressee: "",
        },
    }
}

/// Returns `text` with the leading command token removed and whitespace
/// trimmed. Text without a command is only trimmed.
pub fn strip_command(text: &str) -> &str {
    match command_token(text) {
        Some(token) => text[token.len()..].trim(),
        None => text.trim(),
    }
}
