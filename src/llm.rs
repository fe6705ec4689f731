use crate::config::Config;
use crate::error::ChatError;
use crate::events::Sender;
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::time::Duration;
use tracing::{debug, info, warn};

/// One incremental unit of generated text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamChunk {
    pub text: String,
}

/// Lazy, finite, non-restartable sequence of chunks
pub type ChunkStream = BoxStream<'static, Result<StreamChunk, ChatError>>;

/// An open conversational context with the remote model
#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Send `message` and open a stream over the reply.
    async fn send_message_stream(&self, message: &str) -> Result<ChunkStream, ChatError>;

    /// Model id shown in the header
    fn model(&self) -> &str;
}

/// A turn in the wire format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            role: sender.api_role().to_string(),
            parts: vec![Part {
                text: Some(text.into()),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

impl GenerationConfig {
    fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.max_output_tokens.is_none()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: &'a [Content],
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<u16>,
    message: Option<String>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Splits a server-sent-events byte stream into `data:` payloads
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and return the payloads of every completed line
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            if let Some(payload) = data_payload(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush a trailing line that never got its newline
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        data_payload(&line)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let payload = line.trim().strip_prefix("data:")?.trim_start();
    if payload.is_empty() {
        None
    } else {
        Some(payload.to_string())
    }
}

/// Parse one SSE payload. `Ok(None)` marks an explicit end sentinel.
fn parse_payload(payload: &str) -> Result<Option<StreamChunk>, ChatError> {
    if payload == "[DONE]" {
        return Ok(None);
    }

    let response: GenerateContentResponse =
        serde_json::from_str(payload).map_err(|e| ChatError::Decode(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(ChatError::Api {
            status: error.code.unwrap_or(0),
            message: error.message.unwrap_or_else(|| "unknown error".to_string()),
        });
    }

    Ok(Some(StreamChunk {
        text: response.text(),
    }))
}

/// Pull a readable message out of an error response body
fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    serde_json::from_str::<serde_json::Value>(trimmed)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .or_else(|| value.pointer("/0/error/message"))
                .and_then(|message| message.as_str())
                .map(|message| message.split_whitespace().collect::<Vec<_>>().join(" "))
        })
        .unwrap_or_else(|| trimmed.to_string())
}

struct ChunkStreamState {
    body: Option<BoxStream<'static, Result<Vec<u8>, ChatError>>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    history: Arc<Mutex<Vec<Content>>>,
    user_turn: Option<Content>,
    reply: String,
    finished: bool,
}

impl ChunkStreamState {
    /// Record the exchange once the stream has been fully consumed
    fn commit(&mut self) {
        let Some(user_turn) = self.user_turn.take() else {
            return;
        };
        let mut history = self
            .history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        history.push(user_turn);
        history.push(Content::text(Sender::Ai, std::mem::take(&mut self.reply)));
    }
}

/// Turn a raw SSE body into a chunk stream. The exchange is appended to
/// `history` only when the body is exhausted without error.
pub fn chunk_stream<S>(body: S, history: Arc<Mutex<Vec<Content>>>, user_turn: Content) -> ChunkStream
where
    S: Stream<Item = Result<Vec<u8>, ChatError>> + Send + 'static,
{
    let state = ChunkStreamState {
        body: Some(body.boxed()),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        history,
        user_turn: Some(user_turn),
        reply: String::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            if let Some(payload) = state.pending.pop_front() {
                match parse_payload(&payload) {
                    Ok(Some(chunk)) => {
                        state.reply.push_str(&chunk.text);
                        return Some((Ok(chunk), state));
                    }
                    Ok(None) => {
                        state.pending.clear();
                        state.body = None;
                        continue;
                    }
                    Err(e) => {
                        state.finished = true;
                        return Some((Err(e), state));
                    }
                }
            }

            let Some(body) = state.body.as_mut() else {
                state.commit();
                return None;
            };

            match body.next().await {
                Some(Ok(bytes)) => {
                    let payloads = state.decoder.push(&bytes);
                    state.pending.extend(payloads);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.body = None;
                    if let Some(payload) = state.decoder.finish() {
                        state.pending.push_back(payload);
                    }
                }
            }
        }
    })
    .boxed()
}

/// Session against the Gemini `streamGenerateContent` endpoint
#[derive(Clone)]
pub struct GeminiSession {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    system_instruction: Option<String>,
    generation_config: GenerationConfig,
    history: Arc<Mutex<Vec<Content>>>,
}

impl GeminiSession {
    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    /// Snapshot of the turns recorded so far
    pub fn history(&self) -> Vec<Content> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ChatSession for GeminiSession {
    async fn send_message_stream(&self, message: &str) -> Result<ChunkStream, ChatError> {
        let user_turn = Content::text(Sender::User, message);
        let mut contents = self.history();
        contents.push(user_turn.clone());

        let request = GenerateContentRequest {
            contents: &contents,
            system_instruction: self.system_instruction.as_ref().map(|text| SystemInstruction {
                parts: vec![Part {
                    text: Some(text.clone()),
                }],
            }),
            generation_config: if self.generation_config.is_empty() {
                None
            } else {
                Some(self.generation_config.clone())
            },
        };

        debug!(model = %self.model, turns = contents.len(), "Opening stream");

        let response = self
            .client
            .post(self.stream_url())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = summarize_error_body(&body);
            warn!(status = status.as_u16(), %message, "Stream request rejected");
            return Err(ChatError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ChatError::from));

        Ok(chunk_stream(body, Arc::clone(&self.history), user_turn))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Build a session from the configured credential. No network traffic.
pub fn initialize_chat(config: &Config) -> Result<GeminiSession, ChatError> {
    let api_key = config.get_api_key().ok_or_else(|| {
        ChatError::Initialization(format!(
            "no API key in config or ${}",
            config.api_key_env
        ))
    })?;

    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .build()
        .map_err(|e| ChatError::Initialization(format!("failed to create HTTP client: {e}")))?;

    info!(model = %config.model, "Chat session initialized");

    Ok(GeminiSession {
        client,
        base_url: config.base_url.clone(),
        model: config.model.clone(),
        api_key,
        system_instruction: config.system_instruction.clone(),
        generation_config: GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        },
        history: Arc::new(Mutex::new(Vec::new())),
    })
}
