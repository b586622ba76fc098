//! services/client/src/adapters/channel.rs
//!
//! Implementations of the `MessageChannel` port used by the extension bridge.

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, Mutex};
use tracing::warn;
use walkthrough_core::domain::BridgeMessage;
use walkthrough_core::ports::{MessageChannel, PortError, PortResult};

use crate::app::protocol::{encode_frame, Envelope};

//=========================================================================================
// In-process broadcast
//=========================================================================================

/// An in-process, origin-scoped broadcast channel.
///
/// Every receiver subscribes for one origin and only ever sees messages that
/// were posted to that origin.
#[derive(Clone)]
pub struct LocalChannel {
    tx: broadcast::Sender<(String, BridgeMessage)>,
}

impl LocalChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self, origin: impl Into<String>) -> LocalReceiver {
        LocalReceiver {
            origin: origin.into(),
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for LocalChannel {
    fn default() -> Self {
        Self::new(16)
    }
}

#[async_trait]
impl MessageChannel for LocalChannel {
    async fn post(&self, origin: &str, message: &BridgeMessage) -> PortResult<()> {
        self.tx
            .send((origin.to_string(), message.clone()))
            .map(|_| ())
            .map_err(|_| PortError::Channel("no listener on the local channel".to_string()))
    }
}

pub struct LocalReceiver {
    origin: String,
    rx: broadcast::Receiver<(String, BridgeMessage)>,
}

impl LocalReceiver {
    /// Waits for the next message addressed to this receiver's origin.
    /// Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<BridgeMessage> {
        loop {
            match self.rx.recv().await {
                Ok((origin, message)) if origin == self.origin => return Some(message),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Bridge receiver lagged, {} messages dropped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<BridgeMessage> {
        loop {
            match self.rx.try_recv() {
                Ok((origin, message)) if origin == self.origin => return Some(message),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

//=========================================================================================
// Length-prefixed frames over a byte stream
//=========================================================================================

/// Writes each message as one length-prefixed JSON frame.
pub struct FramedChannel<W> {
    writer: Mutex<W>,
}

impl<W> FramedChannel<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl FramedChannel<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W> MessageChannel for FramedChannel<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn post(&self, origin: &str, message: &BridgeMessage) -> PortResult<()> {
        let frame = encode_frame(&Envelope::new(origin, message))
            .map_err(|e| PortError::Channel(e.to_string()))?;
        let mut writer = self.writer.lock().await;
        writer
            .write_all(&frame)
            .await
            .map_err(|e| PortError::Channel(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| PortError::Channel(e.to_string()))
    }
}
