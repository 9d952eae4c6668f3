use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event sink closed")]
pub struct SinkClosed;

#[async_trait]
pub trait EventSink: Send {
    /// Write one already-framed event. Fails once the client is gone.
    async fn send_event(&mut self, event: Bytes) -> Result<(), SinkClosed>;
}

#[async_trait]
impl EventSink for Vec<Bytes> {
    async fn send_event(&mut self, event: Bytes) -> Result<(), SinkClosed> {
        self.push(event);
        Ok(())
    }
}

/// Feeds a response body through a bounded channel; the receiving half is
/// polled by the HTTP server as the client reads.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<io::Result<Bytes>>) -> Self {
        Self { tx }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<io::Result<Bytes>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Fail the body instead of ending it cleanly.
    pub async fn abort(self, err: io::Error) {
        let _ = self.tx.send(Err(err)).await;
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn send_event(&mut self, event: Bytes) -> Result<(), SinkClosed> {
        self.tx.send(Ok(event)).await.map_err(|_| SinkClosed)
    }
}
