pub mod address;
pub mod epoch;
pub mod error;
pub mod gateway;
pub mod intent;

#[cfg(test)]
mod tests;

pub use address::{Realm, ServiceAddress};
pub use epoch::{Epoch, Tick, TickCommand};
pub use error::{Result, ShardError};
pub use gateway::{Command, EventSubscription, Match, Query};
pub use intent::{create_message_payload, usage, Intent, Payload};
