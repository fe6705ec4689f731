use crate::error::ChatError;
use crate::events::{StreamUpdate, StreamUpdateKind};
use crate::llm::ChatSession;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

pub type UpdateSender = mpsc::UnboundedSender<StreamUpdate>;
pub type UpdateReceiver = mpsc::UnboundedReceiver<StreamUpdate>;

/// Everything a consumer task needs to run one send/stream cycle
pub struct StreamTicket {
    pub stream_id: u64,
    pub text: String,
    pub session: Arc<dyn ChatSession>,
    pub cancel_token: CancellationToken,
}

/// Running text of the reply being streamed
#[derive(Debug, Default, Clone)]
pub struct TextAccumulator {
    text: String,
}

impl TextAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta and return the full text so far
    pub fn push(&mut self, delta: &str) -> &str {
        self.text.push_str(delta);
        &self.text
    }
}

pub fn update_channel() -> (UpdateSender, UpdateReceiver) {
    mpsc::unbounded_channel()
}

/// Run `ticket` on its own task
pub fn spawn_stream(ticket: StreamTicket, tx: UpdateSender) -> JoinHandle<()> {
    tokio::spawn(drive_stream(ticket, tx))
}

/// Drive one cycle to its end. Sends exactly one terminal update unless the
/// ticket is cancelled first, in which case nothing further is sent.
pub async fn drive_stream(ticket: StreamTicket, tx: UpdateSender) {
    let StreamTicket {
        stream_id,
        text,
        session,
        cancel_token,
    } = ticket;

    tokio::select! {
        biased;
        _ = cancel_token.cancelled() => {
            debug!(stream_id, "Stream cancelled");
        }
        outcome = consume(session.as_ref(), &text, stream_id, &tx) => {
            let kind = match outcome {
                Ok(chunks) => {
                    debug!(stream_id, chunks, "Stream completed");
                    StreamUpdateKind::Completed
                }
                Err(e) => {
                    error!(stream_id, error = %e, "Stream failed");
                    StreamUpdateKind::Failed { reason: e.to_string() }
                }
            };
            let _ = tx.send(StreamUpdate { stream_id, kind });
        }
    }
}

async fn consume(
    session: &dyn ChatSession,
    text: &str,
    stream_id: u64,
    tx: &UpdateSender,
) -> Result<usize, ChatError> {
    let mut stream = session.send_message_stream(text).await?;
    let _ = tx.send(StreamUpdate {
        stream_id,
        kind: StreamUpdateKind::Opened,
    });

    let mut accumulator = TextAccumulator::new();
    let mut chunks = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        chunks += 1;
        let text = accumulator.push(&chunk.text).to_string();
        let _ = tx.send(StreamUpdate {
            stream_id,
            kind: StreamUpdateKind::Chunk { text },
        });
    }

    Ok(chunks)
}
