//! Conversation Messages
//!
//! The ordered message log that presentation surfaces render. The log is owned
//! by the [`ChatController`](crate::controller::ChatController); surfaces only
//! ever see cloned snapshots of it.
//!
//! # Invariants
//!
//! - Insertion order is conversation order; entries are never reordered.
//! - At most one message is in progress, it is always the last entry, and it
//!   always has the assistant role.
//! - Only the in-progress tail is mutable. Finalized messages never change.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Shown in place of an assistant message that has not received any text yet
pub const PENDING_GLYPH: &str = "...";

/// Default content of the message that replaces a failed assistant reply
pub const ERROR_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

/// Server-side conversation identifier
///
/// Opaque to the client: the chat service may hand out numeric or string ids,
/// both are stored as text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Create a session id from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who sent a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User input
    User,
    /// Assistant reply
    Assistant,
}

/// A message in the conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: MessageRole,
    /// Accumulated message content
    pub content: String,
    /// Whether the message is still being streamed
    #[serde(default)]
    pub in_progress: bool,
}

impl Message {
    /// Create a finalized user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            in_progress: false,
        }
    }

    /// Create a finalized assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            in_progress: false,
        }
    }

    /// Create an empty assistant message that will receive streamed text
    #[must_use]
    pub fn streaming() -> Self {
        Self {
            role: MessageRole::Assistant,
            content: String::new(),
            in_progress: true,
        }
    }

    /// Text a surface should render for this message
    ///
    /// Assistant messages without any text yet render as [`PENDING_GLYPH`].
    #[must_use]
    pub fn display_content(&self) -> &str {
        if self.role == MessageRole::Assistant && self.content.is_empty() {
            PENDING_GLYPH
        } else {
            &self.content
        }
    }
}

/// Ordered record of the conversation
///
/// Read access is public; every mutation is crate-private so that only the
/// controller can change the log.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log has no messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// All messages in conversation order
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The most recent message
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The in-progress assistant message, if one is streaming
    #[must_use]
    pub fn in_progress(&self) -> Option<&Message> {
        self.messages.last().filter(|m| m.in_progress)
    }

    pub(crate) fn push_user(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    pub(crate) fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(Message::assistant(content));
    }

    /// Start a new in-progress assistant message
    pub(crate) fn begin_assistant(&mut self) {
        self.push(Message::streaming());
    }

    /// Append text to the in-progress tail
    ///
    /// Returns `false` (and changes nothing) when no message is in progress.
    pub(crate) fn append_to_in_progress(&mut self, text: &str) -> bool {
        match self.messages.last_mut() {
            Some(msg) if msg.in_progress => {
                msg.content.push_str(text);
                true
            }
            _ => false,
        }
    }

    /// Freeze the in-progress tail
    pub(crate) fn finalize_in_progress(&mut self) -> bool {
        match self.messages.last_mut() {
            Some(msg) if msg.in_progress => {
                msg.in_progress = false;
                true
            }
            _ => false,
        }
    }

    /// Remove the in-progress tail, returning it
    pub(crate) fn discard_in_progress(&mut self) -> Option<Message> {
        if self.in_progress().is_some() {
            self.messages.pop()
        } else {
            None
        }
    }

    fn push(&mut self, message: Message) {
        debug_assert!(
            self.in_progress().is_none(),
            "cannot append behind an in-progress message"
        );
        self.messages.push(message);
    }
}
