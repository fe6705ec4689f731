//! Ordered, append-only message transcript

use crate::events::{Message, MessageId};

#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    revision: u64,
}

impl MessageStore {
    /// Add a message to the end of the transcript
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.revision += 1;
    }

    /// Replace the text of the message with `id`. Returns false when no
    /// message matches.
    pub fn update_text(&mut self, id: MessageId, text: impl Into<String>) -> bool {
        match self.messages.iter_mut().find(|message| message.id == id) {
            Some(message) => {
                message.text = text.into();
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Bumped on every mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
impl MessageStore {
    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }
}
