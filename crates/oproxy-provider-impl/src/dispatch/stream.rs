use std::io;

use bytes::Bytes;
use futures_util::StreamExt;
use http::StatusCode;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use oproxy_protocol::ndjson::LineDecoder;
use oproxy_protocol::ollama::generate::response::GenerateResponse as OllamaGenerateResponse;
use oproxy_protocol::sse;
use oproxy_provider_core::{ByteStream, EventSink, RelayError, UpstreamBody, Usage};
use oproxy_transform::generate_content::completion_id;
use oproxy_transform::generate_content::openai_chat2ollama::response::usage_from_response;
use oproxy_transform::generate_content::openai_chat2ollama::stream::transform_chunk;

/// Lines shorter than this are blank or noise and never reach the decoder.
pub const MIN_LINE_LEN: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOutcome {
    pub id: String,
    pub text: String,
    pub usage: Option<Usage>,
    // Excludes `[DONE]`.
    pub chunks: usize,
}

#[derive(Debug, Error)]
#[error("{error}")]
pub struct RelayFailure {
    #[source]
    pub error: RelayError,
    pub partial: StreamOutcome,
}

enum Exit {
    Drained,
    ReadFailed(io::Error),
    Backend(String),
    SinkClosed,
}

/// Relay an Ollama NDJSON body to `sink` as OpenAI chat-completion chunks,
/// ending with `data: [DONE]` unless the relay failed. The body is released
/// exactly once, after the writer stops.
pub async fn relay_stream<S>(
    body: UpstreamBody,
    sink: &mut S,
) -> Result<StreamOutcome, RelayFailure>
where
    S: EventSink + ?Sized,
{
    let (stream, release) = body.into_parts();
    let (line_tx, mut line_rx) = mpsc::channel::<Bytes>(1);
    let (done_tx, mut done_rx) = oneshot::channel::<io::Result<()>>();
    let reader = tokio::spawn(read_lines(stream, line_tx, done_tx));

    let mut state = ChunkState::new();
    let exit = loop {
        tokio::select! {
            biased;
            Some(line) = line_rx.recv() => {
                let event = match state.push_line(&line) {
                    Ok(Some(event)) => event,
                    Ok(None) => continue,
                    Err(message) => break Exit::Backend(message),
                };
                if sink.send_event(event).await.is_err() {
                    break Exit::SinkClosed;
                }
                state.outcome.chunks += 1;
            }
            finished = &mut done_rx => {
                break match finished {
                    Ok(Ok(())) => Exit::Drained,
                    Ok(Err(err)) => Exit::ReadFailed(err),
                    Err(_) => Exit::ReadFailed(io::Error::other("stream reader stopped")),
                };
            }
        }
    };

    drop(line_rx);
    if matches!(exit, Exit::SinkClosed | Exit::Backend(_)) {
        reader.abort();
    }
    let _ = reader.await;

    let error = match exit {
        Exit::Drained => match sink.send_event(sse::done_event()).await {
            Ok(()) => None,
            Err(_) => Some(RelayError::Downstream),
        },
        Exit::ReadFailed(err) => Some(RelayError::ReadBody(err)),
        Exit::Backend(message) => Some(RelayError::Backend {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }),
        Exit::SinkClosed => Some(RelayError::Downstream),
    };

    let error = match (error, release.release()) {
        (None, Err(err)) => Some(RelayError::CloseBody(err)),
        (Some(error), Err(err)) => {
            warn!(event = "upstream_release_failed", error = %err);
            Some(error)
        }
        (error, Ok(())) => error,
    };

    match error {
        None => Ok(state.outcome),
        Some(error) => Err(RelayFailure {
            error,
            partial: state.outcome,
        }),
    }
}

async fn read_lines(
    mut stream: ByteStream,
    lines: mpsc::Sender<Bytes>,
    done: oneshot::Sender<io::Result<()>>,
) {
    let mut decoder = LineDecoder::new();
    let result = loop {
        match stream.next().await {
            Some(Ok(chunk)) => {
                let completed = match decoder.push(&chunk) {
                    Ok(completed) => completed,
                    Err(err) => break Err(io::Error::new(io::ErrorKind::InvalidData, err)),
                };
                for line in completed {
                    if !hand_off(&lines, line).await {
                        return;
                    }
                }
            }
            Some(Err(err)) => break Err(err),
            None => {
                if let Some(line) = decoder.finish()
                    && !hand_off(&lines, line).await
                {
                    return;
                }
                break Ok(());
            }
        }
    };
    let _ = done.send(result);
}

async fn hand_off(lines: &mpsc::Sender<Bytes>, line: Bytes) -> bool {
    if line.len() < MIN_LINE_LEN {
        return true;
    }
    lines.send(line).await.is_ok()
}

struct ChunkState {
    outcome: StreamOutcome,
}

impl ChunkState {
    fn new() -> Self {
        Self {
            outcome: StreamOutcome {
                id: completion_id(),
                ..Default::default()
            },
        }
    }

    // Err carries the message of a backend error line.
    fn push_line(&mut self, line: &[u8]) -> Result<Option<Bytes>, String> {
        let unit = match serde_json::from_slice::<OllamaGenerateResponse>(line) {
            Ok(unit) => unit,
            Err(err) => {
                warn!(
                    event = "stream_decode_failed",
                    error = %err,
                    line = %String::from_utf8_lossy(line)
                );
                return Ok(None);
            }
        };
        if let Some(message) = unit.backend_error() {
            return Err(message.to_string());
        }
        if unit.done {
            self.outcome.usage = Some(usage_from_response(&unit));
        }

        let mut chunk = transform_chunk(unit);
        if let Some(choice) = chunk.choices.first() {
            self.outcome.text.push_str(&choice.delta.content);
        }
        chunk.id = self.outcome.id.clone();

        match sse::json_event(&chunk) {
            Ok(event) => Ok(Some(event)),
            Err(err) => {
                warn!(event = "stream_encode_failed", error = %err);
                Ok(None)
            }
        }
    }
}
