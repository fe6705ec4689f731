//! Pure mapping from UI state to what the screen shows

use crate::controller::UiState;
use crate::events::{MessageId, Sender};
use crate::prompts::EXAMPLE_PROMPTS;

#[derive(Debug, Clone, PartialEq)]
pub struct MessageView {
    pub id: MessageId,
    pub sender: Sender,
    pub text: String,
    pub timestamp: String,
    /// Only ever true for a trailing AI message while a response is loading
    pub streaming: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConversationBody {
    ExamplePrompts { selected: usize },
    Transcript(Vec<MessageView>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationView {
    pub body: ConversationBody,
    pub banner: Option<String>,
    pub is_loading: bool,
    pub revision: u64,
}

pub fn present(state: &UiState, selected_prompt: usize) -> ConversationView {
    let body = if state.messages.is_empty() && !state.is_loading {
        ConversationBody::ExamplePrompts {
            selected: selected_prompt.min(EXAMPLE_PROMPTS.len().saturating_sub(1)),
        }
    } else {
        let last = state.messages.len().saturating_sub(1);
        ConversationBody::Transcript(
            state
                .messages
                .iter()
                .enumerate()
                .map(|(index, message)| MessageView {
                    id: message.id,
                    sender: message.sender,
                    text: message.text.clone(),
                    timestamp: message.created_at.format("%H:%M:%S").to_string(),
                    streaming: state.is_loading
                        && index == last
                        && message.sender == Sender::Ai,
                })
                .collect(),
        )
    };

    ConversationView {
        body,
        banner: state.error.clone(),
        is_loading: state.is_loading,
        revision: state.messages.revision(),
    }
}
