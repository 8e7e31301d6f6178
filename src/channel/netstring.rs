use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{Error, Result};

/// Frames above this size are rejected by default.
pub const DEFAULT_MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

// Digits needed to write DEFAULT_MAX_FRAME_LEN plus slack.
const MAX_HEADER_LEN: usize = 10;

/// NetstringCodec frames payloads as `<decimal length>:<payload>,`, the
/// format spoken on the worker pipes.
#[derive(Debug, Clone)]
pub struct NetstringCodec {
    max_frame_len: usize,
}

impl NetstringCodec {
    pub fn new(max_frame_len: usize) -> Self {
        NetstringCodec { max_frame_len }
    }
}

impl Default for NetstringCodec {
    fn default() -> Self {
        NetstringCodec::new(DEFAULT_MAX_FRAME_LEN)
    }
}

impl Decoder for NetstringCodec {
    type Item = Bytes;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        let colon = match src.iter().take(MAX_HEADER_LEN + 1).position(|b| *b == b':') {
            Some(colon) => colon,
            None if src.len() > MAX_HEADER_LEN => {
                return Err(Error::ErrProtocol("netstring header too long".to_owned()))
            }
            None => return Ok(None),
        };

        let header = &src[..colon];
        if header.is_empty() || !header.iter().all(u8::is_ascii_digit) {
            return Err(Error::ErrProtocol(format!(
                "invalid netstring length {:?}",
                String::from_utf8_lossy(header)
            )));
        }
        let len: usize = std::str::from_utf8(header)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::ErrProtocol("invalid netstring length".to_owned()))?;
        if len > self.max_frame_len {
            return Err(Error::ErrFrameTooLong(len));
        }

        let frame_len = colon + 1 + len + 1;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }
        if src[frame_len - 1] != b',' {
            return Err(Error::ErrProtocol("missing netstring terminator".to_owned()));
        }

        src.advance(colon + 1);
        let payload = src.split_to(len).freeze();
        src.advance(1);

        Ok(Some(payload))
    }
}

impl Encoder<Bytes> for NetstringCodec {
    type Error = Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        if item.len() > self.max_frame_len {
            return Err(Error::ErrFrameTooLong(item.len()));
        }

        let header = format!("{}:", item.len());
        dst.reserve(header.len() + item.len() + 1);
        dst.put_slice(header.as_bytes());
        dst.put_slice(&item);
        dst.put_u8(b',');

        Ok(())
    }
}
