//! Command/query dispatcher.
//!
//! Maps a decoded [`Intent`] to exactly one gateway call and renders the
//! outcome to the writer it was built with. Per-call failures are wrapped in
//! the error of the operation that failed (`CommandRejected`, `QueryFailed`,
//! `SubscriptionFailed`) and are fatal to the invocation.

use std::future::Future;
use std::io::Write;

use shard_common::{Command, EventSubscription, Intent, Query, Result, ServiceAddress, ShardError};

use crate::client::ShardClient;
use crate::listen::run_listener;

pub struct Dispatcher<W> {
    client: ShardClient,
    address: ServiceAddress,
    out: W,
}

impl<W: Write> Dispatcher<W> {
    pub fn new(client: ShardClient, address: ServiceAddress, out: W) -> Self {
        Self {
            client,
            address,
            out,
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs the call `intent` stands for. `shutdown` only matters for
    /// `listen`, which runs until it resolves or the stream ends.
    pub async fn dispatch<F>(&mut self, intent: &Intent, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        match intent {
            Intent::Query(payload) => {
                let query = Query::from_payload(payload)?;
                self.run_query(query).await.map(|_| ())
            }
            Intent::Listen { event } => self.listen(event, shutdown).await.map(|_| ()),
            Intent::Subscribe { event } => self.add_subscription(event).await,
            Intent::Unsubscribe { event } => self.remove_subscription(event).await,
            Intent::StreamEpoch => Err(ShardError::InvalidUsage(
                "stream-epoch reads the durable log and does not go through the gateway"
                    .to_string(),
            )),
            _ => {
                let command = intent
                    .to_command()
                    .ok_or_else(|| ShardError::InvalidUsage(shard_common::usage()))?;
                self.send_command(command).await
            }
        }
    }

    pub async fn send_command(&mut self, command: Command) -> Result<()> {
        let name = command.name.clone();
        tracing::debug!("Sending command {}", name);

        self.client
            .send_command(&self.address, command)
            .await
            .map_err(|e| ShardError::CommandRejected {
                name: name.clone(),
                reason: e.to_string(),
            })?;

        writeln!(self.out, "Successfully sent {} command", name)?;
        Ok(())
    }

    /// Prints one compact JSON line per matched entity and returns how many.
    pub async fn run_query(&mut self, query: Query) -> Result<usize> {
        tracing::debug!("Running query for {:?} ({:?})", query.find, query.match_);

        let entities = self
            .client
            .query(&self.address, query)
            .await
            .map_err(|e| ShardError::QueryFailed(e.to_string()))?;

        for entity in &entities {
            writeln!(self.out, "{}", serde_json::to_string(entity)?)?;
        }
        Ok(entities.len())
    }

    pub async fn add_subscription(&mut self, event: &str) -> Result<()> {
        self.client
            .subscribe_events(vec![EventSubscription::single(&self.address, event)])
            .await
            .map_err(|e| {
                ShardError::SubscriptionFailed(format!("failed to subscribe to event: {}", e))
            })?;

        writeln!(self.out, "Successfully added event '{}' to stream", event)?;
        Ok(())
    }

    pub async fn remove_subscription(&mut self, event: &str) -> Result<()> {
        self.client
            .unsubscribe_events(vec![EventSubscription::single(&self.address, event)])
            .await
            .map_err(|e| {
                ShardError::SubscriptionFailed(format!("failed to unsubscribe from event: {}", e))
            })?;

        writeln!(self.out, "Successfully removed event '{}' from stream", event)?;
        Ok(())
    }

    /// Streams live events for one event name. Returns the number rendered.
    pub async fn listen<F>(&mut self, event: &str, shutdown: F) -> Result<usize>
    where
        F: Future<Output = ()>,
    {
        writeln!(self.out, "Listening for events... (Press Ctrl+C to exit)")?;
        self.out.flush()?;

        let stream = self
            .client
            .start_event_stream(vec![EventSubscription::single(&self.address, event)])
            .await?;

        tracing::info!("Event stream open for '{}'", event);
        run_listener(stream, &mut self.out, shutdown).await
    }
}
