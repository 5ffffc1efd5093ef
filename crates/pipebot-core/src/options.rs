//! Outbound call options.

use serde::{Deserialize, Serialize};

/// Text formatting mode for outbound messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParseMode {
    /// Backend default. Never reaches the transport through a pipe; see
    /// [`normalize_send_options`].
    #[default]
    Default,
    Markdown,
    MarkdownV2,
    #[serde(rename = "HTML")]
    Html,
}

impl ParseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "",
            Self::Markdown => "Markdown",
            Self::MarkdownV2 => "MarkdownV2",
            Self::Html => "HTML",
        }
    }
}

/// An inline keyboard button carrying a callback payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub text: String,
    pub data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
        }
    }
}

/// Options for send/edit/photo calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOptions {
    #[serde(default)]
    pub parse_mode: ParseMode,
    #[serde(default)]
    pub disable_web_page_preview: bool,
    #[serde(default)]
    pub disable_notification: bool,
    #[serde(default)]
    pub reply_to_message_id: Option<i64>,
    /// Rows of inline buttons attached to the message.
    #[serde(default)]
    pub reply_markup: Option<Vec<Vec<InlineButton>>>,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = mode;
        self
    }

    pub fn reply_to(mut self, message_id: i64) -> Self {
        self.reply_to_message_id = Some(message_id);
        self
    }

    pub fn silent(mut self) -> Self {
        self.disable_notification = true;
        self
    }

    pub fn no_preview(mut self) -> Self {
        self.disable_web_page_preview = true;
        self
    }

    /// Appends a row of inline buttons.
    pub fn button_row(mut self, row: Vec<InlineButton>) -> Self {
        self.reply_markup.get_or_insert_with(Vec::new).push(row);
        self
    }
}

/// Applies the outbound option rule shared by send, edit and photo calls.
///
/// Missing options become defaults, and a [`ParseMode::Default`] mode is
/// rewritten to [`ParseMode::Markdown`], so the transport always sees an
/// explicit formatting mode.
pub fn normalize_send_options(options: Option<SendOptions>) -> SendOptions {
    let mut options = options.unwrap_or_default();
    if options.parse_mode == ParseMode::Default {
        options.parse_mode = ParseMode::Markdown;
    }
    options
}

/// A photo attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoSource {
    /// A file already known to the backend.
    FileId(String),
    /// A URL the backend fetches itself.
    Url(String),
    /// Raw bytes uploaded with the call.
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub source: PhotoSource,
    #[serde(default)]
    pub caption: Option<String>,
}

impl Photo {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            source: PhotoSource::Url(url.into()),
            caption: None,
        }
    }

    pub fn file_id(id: impl Into<String>) -> Self {
        Self {
            source: PhotoSource::FileId(id.into()),
            caption: None,
        }
    }

    pub fn bytes(data: Vec<u8>) -> Self {
        Self {
            source: PhotoSource::Bytes(data),
            caption: None,
        }
    }

    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// The answer shown to a user after pressing a button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackAnswer {
    pub text: String,
    /// Show as a modal alert instead of a transient notification.
    pub show_alert: bool,
}

/// A transient presence hint shown in a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatAction {
    Typing,
    UploadPhoto,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_none_becomes_markdown() {
        let options = normalize_send_options(None);
        assert_eq!(options.parse_mode, ParseMode::Markdown);
    }

    #[test]
    fn test_normalize_explicit_default_becomes_markdown() {
        let options = normalize_send_options(Some(SendOptions::new().silent()));
        assert_eq!(options.parse_mode, ParseMode::Markdown);
        assert!(options.disable_notification);
    }

    #[test]
    fn test_normalize_keeps_explicit_mode() {
        let options = normalize_send_options(Some(SendOptions::new().parse_mode(ParseMode::Html)));
        assert_eq!(options.parse_mode, ParseMode::Html);
    }

    #[test]
    fn test_button_rows_accumulate() {
        let options = SendOptions::new()
            .button_row(vec![InlineButton::new("Yes", "y"), InlineButton::new("No", "n")])
            .button_row(vec![InlineButton::new("Cancel", "c")]);
        let rows = options.reply_markup.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1].data, "n");
    }
}
