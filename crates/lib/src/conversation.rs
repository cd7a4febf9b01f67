//! Conversation state: the message thread, the input buffer, the dispatch status and
//! the selected space.
//!
//! Messages are append-only; nothing edits or removes them. The selected space only
//! scopes requests sent after it changes, messages carry no space tag.

use serde::{Deserialize, Serialize};

use crate::config::SpacesConfig;

/// Bot text used when the webhook answers without (or with an empty) `output`.
pub const NO_REPLY_PLACEHOLDER: &str = "No reply received";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One entry in the thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Bot,
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// Whether a request is in flight. At most one is, per conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchStatus {
    #[default]
    Idle,
    Sending,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    #[error("unknown space {0:?}")]
    UnknownSpace(String),
}

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    input: String,
    status: DispatchStatus,
    space: Option<String>,
    spaces: Vec<String>,
}

impl Conversation {
    /// Single-space conversation: requests carry no space.
    pub fn new() -> Self {
        Self::default()
    }

    /// Conversation whose space is chosen from `spaces.options`.
    pub fn with_spaces(spaces: &SpacesConfig) -> Self {
        Self {
            space: spaces.initial(),
            spaces: spaces.options.clone(),
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Mutable access for text widgets that edit the buffer in place.
    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn status(&self) -> DispatchStatus {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == DispatchStatus::Sending
    }

    pub(crate) fn set_status(&mut self, status: DispatchStatus) {
        self.status = status;
    }

    pub fn space(&self) -> Option<&str> {
        self.space.as_deref()
    }

    /// The enumerated choices for [`set_space`](Self::set_space); empty in the single-space variant.
    pub fn spaces(&self) -> &[String] {
        &self.spaces
    }

    pub fn set_space(&mut self, value: &str) -> Result<(), ConversationError> {
        if !self.spaces.iter().any(|s| s == value) {
            return Err(ConversationError::UnknownSpace(value.to_string()));
        }
        log::debug!("space set to {}", value);
        self.space = Some(value.to_string());
        Ok(())
    }

    /// Append a user message and clear the input. Blank text is ignored; returns whether it was appended.
    pub fn append_user_message(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if text.trim().is_empty() {
            return false;
        }
        self.messages.push(Message::user(text));
        self.input.clear();
        true
    }

    /// Append a bot message; a missing or empty reply becomes [`NO_REPLY_PLACEHOLDER`].
    pub fn append_bot_message(&mut self, text: Option<&str>) {
        let text = text
            .filter(|t| !t.is_empty())
            .unwrap_or(NO_REPLY_PLACEHOLDER);
        self.messages.push(Message::bot(text));
    }

    /// Mirrors the send button: enabled only while idle with something to send.
    pub fn can_submit(&self) -> bool {
        self.status == DispatchStatus::Idle && !self.input.trim().is_empty()
    }

    /// Busy indicator text, e.g. "Processing in INFRAD...".
    pub fn status_line(&self) -> Option<String> {
        if !self.is_loading() {
            return None;
        }
        Some(match self.space() {
            Some(space) => format!("Processing in {}...", space),
            None => "Processing...".to_string(),
        })
    }

    /// Placeholder text for the input field.
    pub fn input_hint(&self) -> String {
        match self.space() {
            Some(space) => format!("Ask {}...", space),
            None => "Type a message...".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_spaces() -> Conversation {
        Conversation::with_spaces(&SpacesConfig::default())
    }

    #[test]
    fn blank_user_message_is_a_noop() {
        let mut conv = Conversation::new();
        conv.set_input("   ");
        for text in ["", "   ", "\n\t"] {
            assert!(!conv.append_user_message(text));
        }
        assert!(conv.messages().is_empty());
        assert_eq!(conv.input(), "   ");
    }

    #[test]
    fn user_message_keeps_text_verbatim_and_clears_input() {
        let mut conv = Conversation::new();
        conv.set_input("  Hello ");
        assert!(conv.append_user_message(conv.input().to_string()));
        assert_eq!(conv.messages(), &[Message::user("  Hello ")]);
        assert_eq!(conv.input(), "");
    }

    #[test]
    fn bot_message_placeholder() {
        let mut conv = Conversation::new();
        conv.append_bot_message(None);
        conv.append_bot_message(Some(""));
        conv.append_bot_message(Some("**done**"));
        let texts: Vec<&str> = conv.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec![NO_REPLY_PLACEHOLDER, NO_REPLY_PLACEHOLDER, "**done**"]);
        assert!(conv.messages().iter().all(|m| m.sender == Sender::Bot));
    }

    #[test]
    fn set_space_only_accepts_known_values() {
        let mut conv = two_spaces();
        assert_eq!(conv.space(), Some("INFRAD"));
        conv.set_space("OMNIPRO").unwrap();
        assert_eq!(conv.space(), Some("OMNIPRO"));
        assert_eq!(
            conv.set_space("infrad"),
            Err(ConversationError::UnknownSpace("infrad".into()))
        );
        assert_eq!(conv.space(), Some("OMNIPRO"));
    }

    #[test]
    fn single_space_variant_has_no_space() {
        let mut conv = Conversation::new();
        assert_eq!(conv.space(), None);
        assert!(conv.set_space("INFRAD").is_err());
        assert_eq!(conv.input_hint(), "Type a message...");
    }

    #[test]
    fn can_submit_tracks_input_and_status() {
        let mut conv = two_spaces();
        assert!(!conv.can_submit());
        conv.set_input("hi");
        assert!(conv.can_submit());
        conv.set_status(DispatchStatus::Sending);
        assert!(!conv.can_submit());
        assert_eq!(conv.status_line().as_deref(), Some("Processing in INFRAD..."));
        conv.set_status(DispatchStatus::Idle);
        assert_eq!(conv.status_line(), None);
    }

    #[test]
    fn sender_serializes_lowercase() {
        let json = serde_json::to_value(Message::bot("Hi there")).unwrap();
        assert_eq!(json, serde_json::json!({ "text": "Hi there", "sender": "bot" }));
    }
}
