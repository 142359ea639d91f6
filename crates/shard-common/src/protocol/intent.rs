//! Request Codec
//!
//! Turns a command type and its raw argument list into an [`Intent`], and an
//! intent into the [`Payload`] that travels to the shard. The fixed command
//! set validates argument count and types; any other command type becomes
//! [`Intent::Generic`] and is forwarded under its own name.
//!
//! Argument lists always include the command type itself at position 0, the
//! same shape `std::env::args` hands to a binary after its name.

use serde_json::{Map, Value};

use crate::protocol::error::{Result, ShardError};
use crate::protocol::gateway::Command;

/// Untyped structured record sent as a command payload.
pub type Payload = Map<String, Value>;

pub const CREATE_PLAYER: &str = "create-player";
pub const ATTACK_PLAYER: &str = "attack-player";
pub const CALL_EXTERNAL: &str = "call-external";
pub const QUERY: &str = "query";
pub const LISTEN: &str = "listen";
pub const SUBSCRIBE: &str = "subscribe";
pub const UNSUBSCRIBE: &str = "unsubscribe";
pub const STREAM_EPOCH: &str = "stream-epoch";

/// A decoded command-line intent.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    CreatePlayer { nickname: String },
    AttackPlayer { target: String, damage: u32 },
    CallExternal { message: String },
    /// Free-form query document, converted to a [`crate::Query`] at dispatch.
    Query(Payload),
    Listen { event: String },
    Subscribe { event: String },
    Unsubscribe { event: String },
    StreamEpoch,
    /// Any command type outside the fixed set, with `key=value` fields.
    Generic { name: String, fields: Payload },
}

impl Intent {
    /// Parses a full argument list whose first element is the command type.
    ///
    /// # Errors
    ///
    /// - [`ShardError::InvalidUsage`] when the list is empty or a fixed
    ///   command has the wrong number of arguments
    /// - [`ShardError::InvalidArgument`] when a value does not parse
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        match args.first() {
            Some(command_type) => Self::parse_as(command_type.as_ref(), args),
            None => Err(ShardError::InvalidUsage(usage())),
        }
    }

    /// Parses `args` as an intent of `command_type`.
    pub fn parse_as<S: AsRef<str>>(command_type: &str, args: &[S]) -> Result<Self> {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();

        match command_type {
            CREATE_PLAYER => {
                let [_, nickname] = expect_args::<2>(&args, command_type)?;
                Ok(Intent::CreatePlayer {
                    nickname: nickname.to_owned(),
                })
            }
            ATTACK_PLAYER => {
                let [_, target, damage] = expect_args::<3>(&args, command_type)?;
                let damage = parse_damage(damage)?;
                Ok(Intent::AttackPlayer {
                    target: target.to_owned(),
                    damage,
                })
            }
            CALL_EXTERNAL => {
                let [_, message] = expect_args::<2>(&args, command_type)?;
                Ok(Intent::CallExternal {
                    message: message.to_owned(),
                })
            }
            QUERY => {
                let [_, raw] = expect_args::<2>(&args, command_type)?;
                match serde_json::from_str::<Value>(raw) {
                    Ok(Value::Object(map)) => Ok(Intent::Query(map)),
                    Ok(other) => Err(ShardError::InvalidArgument(format!(
                        "query must be a JSON object, got {}",
                        other
                    ))),
                    Err(e) => Err(ShardError::InvalidArgument(format!("invalid JSON: {}", e))),
                }
            }
            LISTEN | SUBSCRIBE | UNSUBSCRIBE => {
                let [_, event] = expect_args::<2>(&args, command_type)?;
                let event = event.to_owned();
                Ok(match command_type {
                    LISTEN => Intent::Listen { event },
                    SUBSCRIBE => Intent::Subscribe { event },
                    _ => Intent::Unsubscribe { event },
                })
            }
            STREAM_EPOCH => {
                expect_args::<1>(&args, command_type)?;
                Ok(Intent::StreamEpoch)
            }
            name => {
                let mut fields = Payload::new();
                for arg in args.iter().skip(1) {
                    let (key, value) = arg.split_once('=').ok_or_else(|| {
                        ShardError::InvalidArgument(format!(
                            "expected key=value for {} command, got '{}'",
                            name, arg
                        ))
                    })?;
                    fields.insert(key.to_owned(), Value::String(value.to_owned()));
                }
                Ok(Intent::Generic {
                    name: name.to_owned(),
                    fields,
                })
            }
        }
    }

    pub fn command_type(&self) -> &str {
        match self {
            Intent::CreatePlayer { .. } => CREATE_PLAYER,
            Intent::AttackPlayer { .. } => ATTACK_PLAYER,
            Intent::CallExternal { .. } => CALL_EXTERNAL,
            Intent::Query(_) => QUERY,
            Intent::Listen { .. } => LISTEN,
            Intent::Subscribe { .. } => SUBSCRIBE,
            Intent::Unsubscribe { .. } => UNSUBSCRIBE,
            Intent::StreamEpoch => STREAM_EPOCH,
            Intent::Generic { name, .. } => name.as_str(),
        }
    }

    /// The structured value sent for this intent.
    pub fn payload(&self) -> Payload {
        let mut payload = Payload::new();
        match self {
            Intent::CreatePlayer { nickname } => {
                payload.insert("nickname".into(), nickname.as_str().into());
            }
            Intent::AttackPlayer { target, damage } => {
                payload.insert("target".into(), target.as_str().into());
                payload.insert("damage".into(), (*damage).into());
            }
            Intent::CallExternal { message } => {
                payload.insert("message".into(), message.as_str().into());
            }
            Intent::Query(query) => payload.clone_from(query),
            Intent::Listen { event }
            | Intent::Subscribe { event }
            | Intent::Unsubscribe { event } => {
                payload.insert("event".into(), event.as_str().into());
            }
            Intent::StreamEpoch => {}
            Intent::Generic { fields, .. } => payload.clone_from(fields),
        }
        payload
    }

    /// The command to send, for intents that go through `SendCommand`.
    pub fn to_command(&self) -> Option<Command> {
        match self {
            Intent::CreatePlayer { .. }
            | Intent::AttackPlayer { .. }
            | Intent::CallExternal { .. }
            | Intent::Generic { .. } => Some(Command {
                name: self.command_type().to_owned(),
                payload: self.payload(),
            }),
            _ => None,
        }
    }
}

/// Validates `args` for `command_type` and returns its payload.
pub fn create_message_payload<S: AsRef<str>>(command_type: &str, args: &[S]) -> Result<Payload> {
    Intent::parse_as(command_type, args).map(|intent| intent.payload())
}

/// Plain decimal digits only; `u32::from_str` would also take a leading `+`.
fn parse_damage(raw: &str) -> Result<u32> {
    if raw.starts_with('+') {
        return Err(ShardError::InvalidArgument(format!(
            "invalid damage value '{}': sign not allowed",
            raw
        )));
    }
    raw.parse::<u32>()
        .map_err(|e| ShardError::InvalidArgument(format!("invalid damage value '{}': {}", raw, e)))
}

fn expect_args<'a, const N: usize>(args: &[&'a str], command_type: &str) -> Result<[&'a str; N]> {
    <[&str; N]>::try_from(args)
        .map_err(|_| ShardError::InvalidUsage(usage_line(command_type).unwrap_or_else(usage)))
}

/// Usage line of one command in the fixed set.
pub fn usage_line(command_type: &str) -> Option<String> {
    let args = match command_type {
        CREATE_PLAYER => " <nickname>",
        ATTACK_PLAYER => " <target> <damage>",
        CALL_EXTERNAL => " <message>",
        QUERY => " <json-query>",
        LISTEN | SUBSCRIBE | UNSUBSCRIBE => " <event-name>",
        STREAM_EPOCH => "",
        _ => return None,
    };
    Some(format!("usage: shard {}{}", command_type, args))
}

/// Full usage banner.
pub fn usage() -> String {
    [
        "Usage:",
        "  Create player: shard create-player <nickname>",
        "  Attack player: shard attack-player <target> <damage>",
        "  Debug log: shard debug-log",
        "  Call external: shard call-external <message>",
        "  Query: shard query <json-query>",
        "  Listen: shard --id <client-id> listen <event-name>",
        "  Subscribe: shard --id <client-id> subscribe <event-name>",
        "  Unsubscribe: shard --id <client-id> unsubscribe <event-name>",
        "  Stream Epoch: shard --id <client-id> stream-epoch",
        "  Custom command: shard <command-name> [key=value ...]",
    ]
    .join("\n")
}
