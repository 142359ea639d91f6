//! Shard Client Transport Framing
//!
//! Streaming calls to the gateway exchange length-prefixed envelopes rather
//! than bare JSON bodies. This module holds the envelope codec; the HTTP
//! plumbing that drives it lives in `shard-client`.
//!
//! # Wire Format
//!
//! ```text
//! [1-byte flags] [4-byte length as u32 big-endian] [payload]
//! ```
//!
//! Flag `0x02` marks the end-of-stream envelope. Flag `0x01` marks a
//! compressed payload, which this client never negotiates and so rejects.

pub mod envelope;

pub use envelope::{Envelope, EnvelopeDecoder, MAX_MESSAGE_SIZE};
