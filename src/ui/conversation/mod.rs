//! Conversation UI components for the chat screen

pub mod commands;
pub mod composer;
pub mod history;
pub mod manager;
pub mod prompt_picker;
pub mod streaming;
pub mod view;

pub use manager::{ConversationAction, ConversationManager};
