use crate::protocol::error::{Result, ShardError};

/// Maximum payload size of a single envelope (100 MB).
pub const MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Size of the flags byte plus the length prefix.
pub const HEADER_LEN: usize = 5;

pub const FLAG_COMPRESSED: u8 = 0x01;
pub const FLAG_END_STREAM: u8 = 0x02;

/// One framed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub flags: u8,
    pub data: Vec<u8>,
}

impl Envelope {
    pub fn message(data: impl Into<Vec<u8>>) -> Self {
        Self {
            flags: 0,
            data: data.into(),
        }
    }

    pub fn end_stream(data: impl Into<Vec<u8>>) -> Self {
        Self {
            flags: FLAG_END_STREAM,
            data: data.into(),
        }
    }

    pub fn is_end_stream(&self) -> bool {
        self.flags & FLAG_END_STREAM != 0
    }

    /// Encodes the envelope with its header.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload exceeds [`MAX_MESSAGE_SIZE`].
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.data.len() > MAX_MESSAGE_SIZE {
            return Err(ShardError::Transport(format!(
                "Message too large: {} bytes (max {})",
                self.data.len(),
                MAX_MESSAGE_SIZE
            )));
        }

        let mut buf = Vec::with_capacity(HEADER_LEN + self.data.len());
        buf.push(self.flags);
        buf.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.data);
        Ok(buf)
    }
}

/// Incremental envelope decoder.
///
/// Bytes arrive in whatever chunks the HTTP body yields; [`push`](Self::push)
/// buffers them and [`next_envelope`](Self::next_envelope) pops complete
/// envelopes in arrival order.
#[derive(Debug, Default)]
pub struct EnvelopeDecoder {
    buf: Vec<u8>,
}

impl EnvelopeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Bytes buffered but not yet part of a complete envelope.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Pops the next complete envelope, or `Ok(None)` if more bytes are needed.
    ///
    /// # Errors
    ///
    /// Returns an error for compressed envelopes and for declared lengths
    /// above [`MAX_MESSAGE_SIZE`].
    pub fn next_envelope(&mut self) -> Result<Option<Envelope>> {
        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }

        let flags = self.buf[0];
        let len = u32::from_be_bytes([self.buf[1], self.buf[2], self.buf[3], self.buf[4]]) as usize;

        if flags & FLAG_COMPRESSED != 0 {
            return Err(ShardError::Transport(
                "Compressed envelopes are not supported".to_string(),
            ));
        }
        if len > MAX_MESSAGE_SIZE {
            return Err(ShardError::Transport(format!(
                "Message too large: {} bytes (max {})",
                len, MAX_MESSAGE_SIZE
            )));
        }
        if self.buf.len() < HEADER_LEN + len {
            return Ok(None);
        }

        let data = self.buf[HEADER_LEN..HEADER_LEN + len].to_vec();
        self.buf.drain(..HEADER_LEN + len);
        Ok(Some(Envelope { flags, data }))
    }
}
