//! Length-prefixed frame relay.
//!
//! A sync frame is a 4-byte big-endian length prefix followed by
//! `length - 4` bytes of payload; the length field counts itself. The relay
//! never interprets payload bytes, it only moves them.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::constants::{FRAME_HEADER_LEN, RELAY_CHUNK_SIZE};
use crate::error::{Error, Result};

/// Encode a payload into a framed message.
pub fn encode_frame(payload: &[u8]) -> Bytes {
    let total = (FRAME_HEADER_LEN + payload.len()) as u32;
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
    buf.put_u32(total);
    buf.put_slice(payload);
    buf.freeze()
}

/// Relay exactly one frame from `from` to `to`.
///
/// The 4-byte prefix is forwarded verbatim, then payload chunks are copied
/// and flushed after every write until the declared total has been
/// forwarded. A source that closes before the declared length terminates
/// the relay cleanly rather than erroring; both endpoints are
/// pre-authenticated, so the length field is otherwise trusted.
///
/// Returns the number of bytes forwarded, prefix included.
pub async fn relay_frame<R, W>(from: &mut R, to: &mut W) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut head = [0u8; FRAME_HEADER_LEN];
    match from.read_exact(&mut head).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            debug!("Stream closed before a frame header arrived");
            return Ok(0);
        }
        Err(e) => return Err(e.into()),
    }
    let total = u64::from(u32::from_be_bytes(head));
    if total < FRAME_HEADER_LEN as u64 {
        return Err(Error::Protocol {
            message: format!("frame declares total length {total}, below the prefix size"),
        });
    }
    to.write_all(&head).await?;
    to.flush().await?;

    let mut forwarded = FRAME_HEADER_LEN as u64;
    let mut buf = [0u8; RELAY_CHUNK_SIZE];
    debug!(total, "Relaying frame");
    while forwarded < total {
        // Never read past the frame boundary; the next frame belongs to
        // whoever relays it.
        let want = usize::try_from(total - forwarded)
            .unwrap_or(RELAY_CHUNK_SIZE)
            .min(RELAY_CHUNK_SIZE);
        let n = from.read(&mut buf[..want]).await?;
        if n == 0 {
            debug!(forwarded, total, "Source closed before declared length");
            break;
        }
        to.write_all(&buf[..n]).await?;
        to.flush().await?;
        forwarded += n as u64;
    }
    Ok(forwarded)
}
