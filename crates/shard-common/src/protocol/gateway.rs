//! Gateway RPC Messages
//!
//! JSON messages of the `gateway.v1.ShardService` surface. Field names are
//! lowerCamelCase and enums travel by their proto names, so these types line
//! up with what the gateway speaks on the wire.
//!
//! # Procedures
//!
//! | Procedure | Request | Response |
//! |---|---|---|
//! | `SendCommand` | [`SendCommandRequest`] | [`Ack`] |
//! | `Query` | [`QueryRequest`] | [`QueryResponse`] |
//! | `SubscribeEvents` | [`SubscribeEventsRequest`] | [`Ack`] |
//! | `UnsubscribeEvents` | [`UnsubscribeEventsRequest`] | [`Ack`] |
//! | `StartEventStream` | [`StartEventStreamRequest`] | stream of events |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::address::ServiceAddress;
use crate::protocol::error::{Result, ShardError};
use crate::protocol::intent::Payload;

/// Fully-qualified service name used to build procedure paths.
pub const SERVICE_NAME: &str = "gateway.v1.ShardService";

pub const SEND_COMMAND: &str = "SendCommand";
pub const QUERY: &str = "Query";
pub const SUBSCRIBE_EVENTS: &str = "SubscribeEvents";
pub const UNSUBSCRIBE_EVENTS: &str = "UnsubscribeEvents";
pub const START_EVENT_STREAM: &str = "StartEventStream";

/// HTTP path of a procedure on the shard service.
pub fn procedure_path(method: &str) -> String {
    format!("/{}/{}", SERVICE_NAME, method)
}

/// A named command with its free-form payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
    pub payload: Payload,
}

/// How the `find` components are matched against an entity's archetype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Match {
    #[default]
    #[serde(rename = "MATCH_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "MATCH_EXACT")]
    Exact,
    #[serde(rename = "MATCH_CONTAINS")]
    Contains,
}

impl Match {
    /// Anything other than `exact` or `contains` is unspecified, never an error.
    pub fn from_user(s: &str) -> Self {
        match s {
            "exact" => Match::Exact,
            "contains" => Match::Contains,
            _ => Match::Unspecified,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub find: Vec<String>,
    #[serde(rename = "match")]
    pub match_: Match,
    /// Filter expression, evaluated by the shard.
    #[serde(rename = "where")]
    pub where_: String,
}

impl Query {
    /// Builds a query from the free-form payload of a `query` intent.
    pub fn from_payload(payload: &Payload) -> Result<Self> {
        let find = match payload.get("find") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_owned).ok_or_else(|| {
                        ShardError::InvalidArgument(format!(
                            "query 'find' entries must be strings, got {}",
                            item
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(ShardError::InvalidArgument(format!(
                    "query 'find' must be a list of component names, got {}",
                    other
                )))
            }
        };

        let match_ = match payload.get("match") {
            None | Some(Value::Null) => Match::Unspecified,
            Some(Value::String(s)) => Match::from_user(s),
            Some(other) => {
                return Err(ShardError::InvalidArgument(format!(
                    "query 'match' must be a string, got {}",
                    other
                )))
            }
        };

        let where_ = match payload.get("where") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(ShardError::InvalidArgument(format!(
                    "query 'where' must be a string, got {}",
                    other
                )))
            }
        };

        Ok(Self { find, match_, where_ })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSubscription {
    pub address: ServiceAddress,
    pub events: Vec<String>,
}

impl EventSubscription {
    /// A subscription covering exactly one event.
    pub fn single(address: &ServiceAddress, event: impl Into<String>) -> Self {
        Self {
            address: address.clone(),
            events: vec![event.into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendCommandRequest {
    pub address: ServiceAddress,
    pub command: Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub address: ServiceAddress,
    pub query: Query,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: QueryResults,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResults {
    /// One self-describing document per matched entity.
    #[serde(default)]
    pub entities: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeEventsRequest {
    pub subscriptions: Vec<EventSubscription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsubscribeEventsRequest {
    pub subscriptions: Vec<EventSubscription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartEventStreamRequest {
    pub subscriptions: Vec<EventSubscription>,
}

/// Empty acknowledgment. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {}

/// Error body of a failed unary call, and of an end-of-stream envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl From<RpcError> for ShardError {
    fn from(err: RpcError) -> Self {
        ShardError::Status {
            code: err.code,
            message: err.message,
        }
    }
}

/// JSON carried by the envelope that terminates a server stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndStream {
    #[serde(default)]
    pub error: Option<RpcError>,
    #[serde(default)]
    pub metadata: Option<Value>,
}
