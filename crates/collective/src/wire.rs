//! Rendezvous wire format
//!
//! Length-prefixed bincode frames: a big-endian u32 payload length followed
//! by the encoded message.

use bytes::{BufMut, Bytes, BytesMut};
use launch_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on one frame; a contribution vector is world-size u64s,
/// so anything near this limit is a corrupt length prefix.
const MAX_FRAME_BYTES: u32 = 16 * 1024 * 1024;

/// Messages exchanged between peers and the rendezvous master
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Peer announces itself with its rank
    Join { rank: u32 },

    /// Master confirms the group assembled
    JoinAck { world_size: u32 },

    /// Peer contributes its vector for one all-reduce round
    Contribute {
        round: u64,
        rank: u32,
        values: Vec<u64>,
    },

    /// Master broadcasts the reduced vector for one round
    Reduced { round: u64, values: Vec<u64> },

    /// Either side aborts the exchange
    Abort { reason: String },
}

/// Encode a message into one length-prefixed frame
pub fn encode_frame(message: &Message) -> Result<Bytes> {
    let payload = bincode::serialize(message).map_err(|e| Error::Serialization(e.to_string()))?;
    let mut frame = BytesMut::with_capacity(4 + payload.len());
    frame.put_u32(payload.len() as u32);
    frame.put_slice(&payload);
    Ok(frame.freeze())
}

/// Decode a message from one frame payload (length prefix already consumed)
pub fn decode_frame(payload: &[u8]) -> Result<Message> {
    bincode::deserialize(payload).map_err(|e| Error::Serialization(e.to_string()))
}

/// Write one message to the stream
pub async fn send_message<W>(writer: &mut W, message: &Message) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one message from the stream
pub async fn recv_message<R>(reader: &mut R) -> Result<Message>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32().await?;
    if len > MAX_FRAME_BYTES {
        return Err(Error::Rendezvous {
            message: format!("oversized frame: {} bytes", len),
        });
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    decode_frame(&payload)
}
