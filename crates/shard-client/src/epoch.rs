//! Durable epoch consumer.
//!
//! Reads the shard's epoch stream from the JetStream broker with a pull
//! consumer, renders each snapshot and acknowledges it. Delivery is
//! at-least-once:
//!
//! - a message is acknowledged only after it has been rendered
//! - a body that fails to decode is logged and left unacknowledged, so the
//!   broker redelivers it later
//! - messages are handled one at a time in delivery order, so message `k+1`
//!   is never acknowledged before message `k`
//! - duplicates are rendered again, never filtered
//!
//! The consumer moves through [`ConsumerState`]:
//! `Disconnected → Connected → ConsumerReady → Consuming → Stopped`, with any
//! step able to end in `Failed`.

use std::fmt::Display;
use std::future::Future;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use async_nats::jetstream::consumer::pull::{self, MessagesError, MessagesErrorKind};
use async_nats::jetstream::consumer::{DeliverPolicy, PullConsumer};
use async_nats::jetstream;
use futures_util::{Stream, StreamExt};
use shard_common::{Epoch, Result, ServiceAddress, ShardError};

pub const DEFAULT_NATS_URL: &str = "nats://localhost:4222";
pub const DEFAULT_NATS_USER: &str = "nats";
pub const DEFAULT_NATS_PASSWORD: &str = "nats";

/// Last nanosecond stamp handed out as a consumer name
static LAST_CONSUMER_STAMP: AtomicU64 = AtomicU64::new(0);

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    pub url: String,
    pub user: String,
    pub password: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_NATS_URL.to_string(),
            user: DEFAULT_NATS_USER.to_string(),
            password: DEFAULT_NATS_PASSWORD.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Disconnected,
    Connected,
    ConsumerReady,
    Consuming,
    Stopped,
    Failed,
}

/// Counters reported when consumption stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeStats {
    pub rendered: u64,
    pub acked: u64,
    pub undecodable: u64,
    /// Recoverable pull errors, such as missed heartbeats.
    pub pull_errors: u64,
}

/// A message pulled from the durable log.
pub trait Delivery {
    fn payload(&self) -> &[u8];

    /// Commits this message to the broker.
    fn ack(&self) -> impl Future<Output = Result<()>>;
}

impl Delivery for jetstream::Message {
    fn payload(&self) -> &[u8] {
        &self.message.payload
    }

    async fn ack(&self) -> Result<()> {
        jetstream::Message::ack(self)
            .await
            .map_err(|e| ShardError::Transport(format!("failed to ack message: {}", e)))
    }
}

/// An error yielded by the pull stream.
pub trait PullError: Display {
    /// Whether the stream can no longer deliver. Anything else is logged
    /// and pulling continues.
    fn is_terminal(&self) -> bool;
}

impl PullError for MessagesError {
    fn is_terminal(&self) -> bool {
        matches!(
            self.kind(),
            MessagesErrorKind::ConsumerDeleted | MessagesErrorKind::PushBasedConsumer
        )
    }
}

/// Unique name for a fresh consumer, `epoch-consumer-{unix_nanos}`.
///
/// Stamps are strictly increasing within the process even when the clock
/// does not advance between calls.
pub fn consumer_name() -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let mut last = LAST_CONSUMER_STAMP.load(Ordering::SeqCst);
    loop {
        let stamp = now.max(last + 1);
        let swapped =
            LAST_CONSUMER_STAMP.compare_exchange(last, stamp, Ordering::SeqCst, Ordering::SeqCst);
        match swapped {
            Ok(_) => return format!("epoch-consumer-{}", stamp),
            Err(actual) => last = actual,
        }
    }
}

/// Pull-consumer configuration for `address`'s epoch subject, replaying
/// from the earliest retained message.
pub fn consumer_config(address: &ServiceAddress, name: &str) -> pull::Config {
    pull::Config {
        name: Some(name.to_string()),
        filter_subject: address.epoch_subject(),
        deliver_policy: DeliverPolicy::All,
        ..Default::default()
    }
}

/// Renders and acknowledges messages from `messages` in order until the
/// stream ends or `shutdown` resolves.
///
/// `shutdown` is only observed between messages: a message being handled
/// is finished first, and nothing is pulled after the signal.
///
/// # Errors
///
/// A terminal pull error (see [`PullError`]) or a failed write to `out` ends
/// consumption. Recoverable pull errors, decode failures and ack failures are
/// logged and consumption continues.
pub async fn consume_epochs<S, D, E, W, F>(
    messages: S,
    out: &mut W,
    shutdown: F,
) -> Result<ConsumeStats>
where
    S: Stream<Item = std::result::Result<D, E>>,
    D: Delivery,
    E: PullError,
    W: Write,
    F: Future<Output = ()>,
{
    futures_util::pin_mut!(messages);
    tokio::pin!(shutdown);
    let mut stats = ConsumeStats::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::info!("Epoch consumer cancelled");
                break;
            }
            next = messages.next() => next,
        };

        let message = match next {
            Some(Ok(message)) => message,
            Some(Err(e)) if e.is_terminal() => {
                return Err(ShardError::Transport(format!("failed to pull messages: {}", e)));
            }
            Some(Err(e)) => {
                tracing::warn!("Pull interrupted, continuing: {}", e);
                stats.pull_errors += 1;
                continue;
            }
            None => {
                tracing::info!("Epoch stream ended");
                break;
            }
        };

        let epoch = match Epoch::from_bytes(message.payload()) {
            Ok(epoch) => epoch,
            Err(e) => {
                tracing::warn!("Failed to unmarshal epoch, leaving it unacknowledged: {}", e);
                stats.undecodable += 1;
                continue;
            }
        };

        writeln!(out, "Received epoch: {}", epoch.render())?;
        out.flush()?;
        stats.rendered += 1;

        match message.ack().await {
            Ok(()) => stats.acked += 1,
            Err(e) => tracing::warn!("{}", e),
        }
    }

    Ok(stats)
}

/// Durable-log consumer for one shard's epochs.
pub struct EpochConsumer {
    config: BrokerConfig,
    address: ServiceAddress,
    state: ConsumerState,
    client: Option<async_nats::Client>,
    consumer: Option<PullConsumer>,
    name: Option<String>,
}

impl EpochConsumer {
    pub fn new(config: BrokerConfig, address: ServiceAddress) -> Self {
        Self {
            config,
            address,
            state: ConsumerState::Disconnected,
            client: None,
            consumer: None,
            name: None,
        }
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    /// Name of the broker-side consumer, once created.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn fail(&mut self, err: ShardError) -> ShardError {
        tracing::error!("Epoch consumer failed: {}", err);
        self.state = ConsumerState::Failed;
        self.consumer = None;
        self.client = None;
        err
    }

    /// Disconnected → Connected.
    pub async fn connect(&mut self) -> Result<()> {
        let options = async_nats::ConnectOptions::with_user_and_password(
            self.config.user.clone(),
            self.config.password.clone(),
        );

        match options.connect(self.config.url.as_str()).await {
            Ok(client) => {
                tracing::info!("Connected to broker at {}", self.config.url);
                self.client = Some(client);
                self.state = ConsumerState::Connected;
                Ok(())
            }
            Err(e) => Err(self.fail(ShardError::BrokerUnreachable(e.to_string()))),
        }
    }

    /// Connected → ConsumerReady. Creates (or updates) a uniquely named pull
    /// consumer on the shard's epoch stream and returns its name.
    pub async fn prepare(&mut self) -> Result<String> {
        let Some(client) = self.client.clone() else {
            return Err(self.fail(ShardError::ConsumerSetupFailed(
                "not connected to the broker".to_string(),
            )));
        };

        let js = jetstream::new(client);
        let stream_name = self.address.epoch_stream_name();
        let name = consumer_name();

        let stream = match js.get_stream(&stream_name).await {
            Ok(stream) => stream,
            Err(e) => {
                return Err(self.fail(ShardError::ConsumerSetupFailed(format!(
                    "stream {}: {}",
                    stream_name, e
                ))))
            }
        };

        match stream.create_consumer(consumer_config(&self.address, &name)).await {
            Ok(consumer) => {
                tracing::info!("Consumer {} ready on stream {}", name, stream_name);
                self.consumer = Some(consumer);
                self.name = Some(name.clone());
                self.state = ConsumerState::ConsumerReady;
                Ok(name)
            }
            Err(e) => Err(self.fail(ShardError::ConsumerSetupFailed(e.to_string()))),
        }
    }

    /// ConsumerReady → Consuming → Stopped. Releases the broker connection on
    /// every exit.
    pub async fn run<W, F>(&mut self, out: &mut W, shutdown: F) -> Result<ConsumeStats>
    where
        W: Write,
        F: Future<Output = ()>,
    {
        let Some(consumer) = self.consumer.take() else {
            return Err(self.fail(ShardError::ConsumerSetupFailed(
                "consumer has not been created".to_string(),
            )));
        };

        let messages = match consumer.messages().await {
            Ok(messages) => messages,
            Err(e) => {
                let err = ShardError::Transport(format!("failed to consume messages: {}", e));
                return Err(self.fail(err));
            }
        };

        self.state = ConsumerState::Consuming;
        let result = consume_epochs(messages, out, shutdown).await;
        self.client = None;

        match result {
            Ok(stats) => {
                self.state = ConsumerState::Stopped;
                tracing::info!(
                    "Epoch consumer stopped: {} rendered, {} acked, {} undecodable, {} pull errors",
                    stats.rendered,
                    stats.acked,
                    stats.undecodable,
                    stats.pull_errors
                );
                Ok(stats)
            }
            Err(e) => Err(self.fail(e)),
        }
    }
}

/// Connects, prepares a consumer and streams epochs until `shutdown`.
pub async fn stream_epochs<W, F>(
    config: BrokerConfig,
    address: ServiceAddress,
    out: &mut W,
    shutdown: F,
) -> Result<ConsumeStats>
where
    W: Write,
    F: Future<Output = ()>,
{
    let subject = address.epoch_subject();
    let mut consumer = EpochConsumer::new(config, address);

    consumer.connect().await?;
    consumer.prepare().await?;

    writeln!(out, "Streaming epochs from {}... (Press Ctrl+C to exit)", subject)?;
    out.flush()?;

    consumer.run(out, shutdown).await
}
