//! Epoch Snapshots
//!
//! Binary schema of the snapshot a shard publishes to its epoch stream once
//! per epoch. Messages are protobuf-encoded; the structs here carry the
//! schema directly through `prost` derives.
//!
//! [`Epoch::to_json`] renders every field, including zero and empty ones, so
//! that consecutive epochs print with the same shape and diff cleanly.
//! 64-bit integers render as strings and bytes as base64, the canonical JSON
//! mapping for protobuf.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use prost::Message;
use serde_json::{json, Value};

use crate::protocol::error::Result;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Epoch {
    #[prost(uint64, tag = "1")]
    pub epoch_height: u64,
    /// Height of the first tick in this epoch.
    #[prost(uint64, tag = "2")]
    pub tick_height: u64,
    /// State hash at the end of the epoch.
    #[prost(bytes = "vec", tag = "3")]
    pub hash: Vec<u8>,
    #[prost(message, repeated, tag = "4")]
    pub ticks: Vec<Tick>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Tick {
    #[prost(uint64, tag = "1")]
    pub tick_height: u64,
    #[prost(int64, tag = "2")]
    pub timestamp_unix_nanos: i64,
    #[prost(message, repeated, tag = "3")]
    pub commands: Vec<TickCommand>,
}

/// A command applied during a tick.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TickCommand {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub persona: String,
    #[prost(bytes = "vec", tag = "3")]
    pub payload: Vec<u8>,
}

impl Epoch {
    /// Decodes a message body from the epoch stream.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self::decode(data)?)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "epochHeight": self.epoch_height.to_string(),
            "tickHeight": self.tick_height.to_string(),
            "hash": STANDARD.encode(&self.hash),
            "ticks": self.ticks.iter().map(Tick::to_json).collect::<Vec<_>>(),
        })
    }

    /// Multi-line rendering with two-space indentation.
    pub fn render(&self) -> String {
        serde_json::to_string_pretty(&self.to_json()).unwrap_or_default()
    }
}

impl Tick {
    pub fn to_json(&self) -> Value {
        json!({
            "tickHeight": self.tick_height.to_string(),
            "timestampUnixNanos": self.timestamp_unix_nanos.to_string(),
            "commands": self.commands.iter().map(TickCommand::to_json).collect::<Vec<_>>(),
        })
    }
}

impl TickCommand {
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "persona": self.persona,
            "payload": STANDARD.encode(&self.payload),
        })
    }
}
