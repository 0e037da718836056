//! Transcript rendering
//!
//! Turns successive [`ChatSnapshot`]s into the text that still has to be
//! written to the terminal. Snapshots can be coalesced by the watch channel,
//! so rendering works from the difference between what was printed and what
//! the snapshot holds, never from individual events.

use streamchat_core::{ChatSnapshot, Message, MessageRole, PENDING_GLYPH};

const USER_PREFIX: &str = "you> ";
const ASSISTANT_PREFIX: &str = "assistant> ";

/// Incremental printer for the message log
#[derive(Debug, Default)]
pub struct TranscriptPrinter {
    /// Messages printed in full
    printed: usize,
    /// Text already printed for the message at index `printed`
    tail: Option<String>,
    /// The pending glyph is on screen after the tail
    glyph_shown: bool,
}

impl TranscriptPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text to append to the terminal for `snapshot`
    pub fn render(&mut self, snapshot: &ChatSnapshot) -> String {
        let mut out = String::new();

        while let Some(message) = snapshot.messages.get(self.printed) {
            self.render_message(message, &mut out);
            if message.in_progress {
                break;
            }
            self.printed += 1;
        }

        out
    }

    fn render_message(&mut self, message: &Message, out: &mut String) {
        if message.in_progress && message.content.is_empty() {
            if self.tail.is_none() {
                out.push_str(prefix(message.role));
                out.push_str(message.display_content());
                self.tail = Some(String::new());
                self.glyph_shown = true;
            }
            return;
        }
        if std::mem::take(&mut self.glyph_shown) {
            erase_glyph(out);
        }

        let shown = match self.tail.take() {
            Some(shown) if message.content.starts_with(&shown) => shown,
            Some(_) => {
                // The streamed text was replaced (failed turn); start over
                out.push('\n');
                out.push_str(prefix(message.role));
                String::new()
            }
            None => {
                out.push_str(prefix(message.role));
                String::new()
            }
        };

        out.push_str(&message.content[shown.len()..]);

        if message.in_progress {
            self.tail = Some(message.content.clone());
        } else {
            out.push('\n');
        }
    }
}

/// Backspace over the pending glyph and blank it out
fn erase_glyph(out: &mut String) {
    let width = PENDING_GLYPH.chars().count();
    let back = "\u{8}".repeat(width);
    out.push_str(&back);
    out.push_str(&" ".repeat(width));
    out.push_str(&back);
}

fn prefix(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => USER_PREFIX,
        MessageRole::Assistant => ASSISTANT_PREFIX,
    }
}
