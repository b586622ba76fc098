//! services/client/src/app/protocol.rs
//!
//! Defines the message protocol between this client and the browser extension.
//!
//! Every message travels inside an [`Envelope`] naming the origin it is scoped
//! to. On byte streams each envelope is one frame: a 4-byte little-endian
//! length followed by that many bytes of JSON, the framing browsers use for
//! native messaging hosts.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use walkthrough_core::domain::BridgeMessage;

/// Frames above this size are rejected by the reader.
pub const MAX_FRAME_LEN: u32 = 1024 * 1024;

//=========================================================================================
// Messages Sent FROM the Client TO the Extension
//=========================================================================================

/// The structured messages the extension's content script can receive.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtensionMessage {
    /// The current bearer token. Replaces any token the extension holds.
    Auth { token: String },

    /// The user logged out; the extension must drop its token.
    Logout,
}

impl From<&BridgeMessage> for ExtensionMessage {
    fn from(message: &BridgeMessage) -> Self {
        match message {
            BridgeMessage::Auth { token } => ExtensionMessage::Auth {
                token: token.clone(),
            },
            BridgeMessage::Logout => ExtensionMessage::Logout,
        }
    }
}

impl From<ExtensionMessage> for BridgeMessage {
    fn from(message: ExtensionMessage) -> Self {
        match message {
            ExtensionMessage::Auth { token } => BridgeMessage::Auth { token },
            ExtensionMessage::Logout => BridgeMessage::Logout,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub origin: String,
    pub message: ExtensionMessage,
}

impl Envelope {
    pub fn new(origin: impl Into<String>, message: &BridgeMessage) -> Self {
        Self {
            origin: origin.into(),
            message: message.into(),
        }
    }
}

//=========================================================================================
// Framing
//=========================================================================================

pub fn encode_frame(envelope: &Envelope) -> serde_json::Result<Vec<u8>> {
    let body = serde_json::to_vec(envelope)?;
    let mut frame = Vec::with_capacity(body.len() + 4);
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Reads one frame. Returns `Ok(None)` on a clean end of stream.
pub async fn read_frame<R>(reader: &mut R) -> std::io::Result<Option<Envelope>>
where
    R: AsyncRead + Unpin,
{
    let mut len = [0u8; 4];
    match reader.read_exact(&mut len).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u32::from_le_bytes(len);
    if len > MAX_FRAME_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit", len),
        ));
    }

    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    let envelope = serde_json::from_slice(&body)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok(Some(envelope))
}
