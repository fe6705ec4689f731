//! In-memory session used by the unit tests

use crate::error::ChatError;
use crate::llm::{ChatSession, ChunkStream, StreamChunk};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use std::sync::Mutex;

/// Replays a fixed list of chunks, optionally failing on open or mid-stream
pub struct ScriptedSession {
    chunks: Vec<String>,
    fail_open: bool,
    fail_after: Option<usize>,
    sent: Mutex<Vec<String>>,
}

impl ScriptedSession {
    pub fn with_chunks(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|chunk| chunk.to_string()).collect(),
            fail_open: false,
            fail_after: None,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::with_chunks(&[])
        }
    }

    /// Yield `count` chunks, then an error
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn sent_messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatSession for ScriptedSession {
    async fn send_message_stream(&self, message: &str) -> Result<ChunkStream, ChatError> {
        self.sent.lock().unwrap().push(message.to_string());

        if self.fail_open {
            return Err(ChatError::Api {
                status: 503,
                message: "unavailable".into(),
            });
        }

        let mut items: Vec<Result<StreamChunk, ChatError>> = self
            .chunks
            .iter()
            .map(|text| Ok(StreamChunk { text: text.clone() }))
            .collect();

        if let Some(count) = self.fail_after {
            items.truncate(count);
            items.push(Err(ChatError::Decode("connection reset".into())));
        }

        Ok(stream::iter(items).boxed())
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}
