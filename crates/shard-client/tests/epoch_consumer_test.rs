//! Epoch Consumer Delivery Tests
//!
//! Drive `consume_epochs` with in-memory deliveries that record their acks,
//! covering ordering, poison messages, duplicates and cancellation without a
//! broker.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use prost::Message;

use shard_client::epoch::{consume_epochs, Delivery, PullError};
use shard_client::ConsumeStats;
use shard_common::{Epoch, Result, ShardError, Tick, TickCommand};

#[derive(Clone)]
struct FakeDelivery {
    seq: u64,
    payload: Vec<u8>,
    acks: Arc<Mutex<Vec<u64>>>,
    fail_ack: bool,
}

impl Delivery for FakeDelivery {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn ack(&self) -> Result<()> {
        if self.fail_ack {
            return Err(ShardError::Transport("ack timed out".to_string()));
        }
        self.acks.lock().unwrap().push(self.seq);
        Ok(())
    }
}

#[derive(Debug)]
struct FakePullError {
    reason: &'static str,
    terminal: bool,
}

impl std::fmt::Display for FakePullError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason)
    }
}

impl PullError for FakePullError {
    fn is_terminal(&self) -> bool {
        self.terminal
    }
}

type Pulled = std::result::Result<FakeDelivery, FakePullError>;

struct Log {
    acks: Arc<Mutex<Vec<u64>>>,
}

impl Log {
    fn new() -> Self {
        Self {
            acks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn epoch(&self, seq: u64, height: u64) -> FakeDelivery {
        let epoch = Epoch {
            epoch_height: height,
            tick_height: height * 10,
            hash: vec![0xde, 0xad],
            ticks: vec![Tick {
                tick_height: height * 10,
                timestamp_unix_nanos: 1_700_000_000_000_000_000,
                commands: vec![TickCommand {
                    name: "create-player".to_string(),
                    persona: "alice".to_string(),
                    payload: b"{}".to_vec(),
                }],
            }],
        };
        self.raw(seq, epoch.encode_to_vec())
    }

    fn raw(&self, seq: u64, payload: Vec<u8>) -> FakeDelivery {
        FakeDelivery {
            seq,
            payload,
            acks: self.acks.clone(),
            fail_ack: false,
        }
    }

    fn acked(&self) -> Vec<u64> {
        self.acks.lock().unwrap().clone()
    }
}

fn ok(items: Vec<FakeDelivery>) -> Vec<Pulled> {
    items.into_iter().map(Ok).collect()
}

#[tokio::test]
async fn test_acks_follow_delivery_order() {
    let log = Log::new();
    let messages = stream::iter(ok(vec![log.epoch(1, 1), log.epoch(2, 2), log.epoch(3, 3)]));
    let mut out = Vec::new();

    let stats = consume_epochs(messages, &mut out, std::future::pending()).await.unwrap();

    assert_eq!(
        stats,
        ConsumeStats {
            rendered: 3,
            acked: 3,
            undecodable: 0,
            pull_errors: 0,
        }
    );
    assert_eq!(log.acked(), vec![1, 2, 3]);

    let output = String::from_utf8(out).unwrap();
    assert_eq!(output.matches("Received epoch:").count(), 3);
    let first = output.find("\"epochHeight\": \"1\"").unwrap();
    let third = output.find("\"epochHeight\": \"3\"").unwrap();
    assert!(first < third);
    assert!(output.contains("\"persona\": \"alice\""));
}

#[tokio::test]
async fn test_undecodable_message_is_not_acked() {
    let log = Log::new();
    // Field 1 with wire type 7, which protobuf does not define
    let poison = log.raw(2, vec![0x0f]);
    let messages = stream::iter(ok(vec![log.epoch(1, 1), poison, log.epoch(3, 3)]));
    let mut out = Vec::new();

    let stats = consume_epochs(messages, &mut out, std::future::pending()).await.unwrap();

    assert_eq!(stats.rendered, 2);
    assert_eq!(stats.undecodable, 1);
    assert_eq!(log.acked(), vec![1, 3]);
}

#[tokio::test]
async fn test_redelivered_epoch_renders_again() {
    let log = Log::new();
    let messages = stream::iter(ok(vec![log.epoch(1, 5), log.epoch(2, 5)]));
    let mut out = Vec::new();

    let stats = consume_epochs(messages, &mut out, std::future::pending()).await.unwrap();

    assert_eq!(stats.rendered, 2);
    let output = String::from_utf8(out).unwrap();
    assert_eq!(output.matches("\"epochHeight\": \"5\"").count(), 2);
    assert_eq!(log.acked(), vec![1, 2]);
}

#[tokio::test]
async fn test_failed_ack_keeps_consuming() {
    let log = Log::new();
    let mut flaky = log.epoch(1, 1);
    flaky.fail_ack = true;
    let messages = stream::iter(ok(vec![flaky, log.epoch(2, 2)]));
    let mut out = Vec::new();

    let stats = consume_epochs(messages, &mut out, std::future::pending()).await.unwrap();

    assert_eq!(stats.rendered, 2);
    assert_eq!(stats.acked, 1);
    assert_eq!(log.acked(), vec![2]);
}

#[tokio::test]
async fn test_missed_heartbeat_keeps_consuming() {
    let log = Log::new();
    let items: Vec<Pulled> = vec![
        Ok(log.epoch(1, 1)),
        Err(FakePullError {
            reason: "missed idle heartbeat",
            terminal: false,
        }),
        Ok(log.epoch(2, 2)),
    ];
    let mut out = Vec::new();

    let stats = consume_epochs(stream::iter(items), &mut out, std::future::pending())
        .await
        .unwrap();

    assert_eq!(stats.rendered, 2);
    assert_eq!(stats.pull_errors, 1);
    assert_eq!(log.acked(), vec![1, 2]);
}

#[tokio::test]
async fn test_terminal_pull_error_is_fatal() {
    let log = Log::new();
    let items: Vec<Pulled> = vec![
        Ok(log.epoch(1, 1)),
        Err(FakePullError {
            reason: "consumer deleted",
            terminal: true,
        }),
        Ok(log.epoch(3, 3)),
    ];
    let mut out = Vec::new();

    let err = consume_epochs(stream::iter(items), &mut out, std::future::pending())
        .await
        .unwrap_err();

    assert!(matches!(err, ShardError::Transport(ref msg) if msg.contains("consumer deleted")));
    assert_eq!(log.acked(), vec![1]);
}

#[tokio::test]
async fn test_shutdown_stops_idle_consumer() {
    let log = Log::new();
    let messages =
        stream::iter(ok(vec![log.epoch(1, 1), log.epoch(2, 2)])).chain(stream::pending());
    let mut out = Vec::new();

    let stats = tokio::time::timeout(
        Duration::from_secs(5),
        consume_epochs(messages, &mut out, tokio::time::sleep(Duration::from_millis(50))),
    )
    .await
    .expect("consumer did not stop on shutdown")
    .unwrap();

    assert_eq!(stats.rendered, 2);
    assert_eq!(log.acked(), vec![1, 2]);
}

#[tokio::test]
async fn test_nothing_pulled_after_shutdown() {
    let log = Log::new();
    let messages = stream::iter(ok(vec![log.epoch(1, 1)]));
    let mut out = Vec::new();

    let stats = consume_epochs(messages, &mut out, std::future::ready(())).await.unwrap();

    assert_eq!(stats, ConsumeStats::default());
    assert!(out.is_empty());
    assert!(log.acked().is_empty());
}
