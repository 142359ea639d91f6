//! Live event stream consumer.
//!
//! The gateway opens every event stream with one synthetic handshake frame.
//! [`SkipHandshake`] swallows it so the render loop in [`run_listener`] only
//! ever sees real events. Delivery on this channel is best effort: nothing is
//! acknowledged, and events pushed while disconnected are lost.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use hyper::body::{Body, Bytes};
use serde_json::Value;
use shard_common::Result;

use crate::transport::{Received, ServerStream};

/// Pause after a poll that produced nothing, before polling again.
pub const EMPTY_POLL_BACKOFF: Duration = Duration::from_millis(100);

/// Anything that yields stream messages one receive at a time.
pub trait EventSource {
    fn receive(&mut self) -> impl Future<Output = Result<Received<Value>>>;
}

impl<B> EventSource for ServerStream<B>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: std::fmt::Display,
{
    async fn receive(&mut self) -> Result<Received<Value>> {
        ServerStream::receive(self).await
    }
}

/// Drops the first message of the wrapped source.
pub struct SkipHandshake<S> {
    inner: S,
    handshake_seen: bool,
}

impl<S: EventSource> SkipHandshake<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            handshake_seen: false,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: EventSource> EventSource for SkipHandshake<S> {
    async fn receive(&mut self) -> Result<Received<Value>> {
        loop {
            let received = self.inner.receive().await?;
            if self.handshake_seen {
                return Ok(received);
            }
            match received {
                Received::Message(_) => {
                    tracing::debug!("Event stream handshake received");
                    self.handshake_seen = true;
                }
                other => return Ok(other),
            }
        }
    }
}

/// Renders every event after the handshake until the stream closes, fails,
/// or `shutdown` resolves. Returns the number of events rendered.
///
/// # Errors
///
/// A stream error ends the loop and is returned; events already written stay
/// written.
pub async fn run_listener<S, W, F>(source: S, out: &mut W, shutdown: F) -> Result<usize>
where
    S: EventSource,
    W: Write,
    F: Future<Output = ()>,
{
    let mut events = SkipHandshake::new(source);
    tokio::pin!(shutdown);
    let mut rendered = 0;

    loop {
        let received = tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::info!("Listener cancelled after {} events", rendered);
                return Ok(rendered);
            }
            received = events.receive() => received,
        };

        match received {
            Ok(Received::Message(event)) => {
                writeln!(out, "Received event: {}", serde_json::to_string_pretty(&event)?)?;
                out.flush()?;
                rendered += 1;
            }
            Ok(Received::Empty) => {
                tokio::select! {
                    biased;
                    _ = &mut shutdown => return Ok(rendered),
                    _ = tokio::time::sleep(EMPTY_POLL_BACKOFF) => {}
                }
            }
            Ok(Received::Closed) => {
                tracing::info!("Event stream closed after {} events", rendered);
                return Ok(rendered);
            }
            Err(e) => {
                tracing::warn!("Event stream error: {}", e);
                return Err(e);
            }
        }
    }
}
