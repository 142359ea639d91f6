// Copyright 2025 Shard Client Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Shard Gateway Client
//!
//! Talks to one game shard over two channels:
//!
//! - the gateway RPC surface ([`ShardClient`], driven by [`Dispatcher`]) for
//!   commands, queries, subscription management and the live event stream
//! - the durable epoch log ([`epoch`]), read directly from the JetStream
//!   broker with acknowledged, resumable delivery
//!
//! A process uses one mode per run: a one-shot call, a live listener, or an
//! epoch consumer.

pub mod client;
pub mod dispatch;
pub mod epoch;
pub mod listen;
pub mod transport;

pub use client::ShardClient;
pub use dispatch::Dispatcher;
pub use epoch::{stream_epochs, BrokerConfig, ConsumeStats, ConsumerState, EpochConsumer};
pub use listen::{run_listener, EventSource, SkipHandshake};
pub use transport::{GatewayTransport, Interceptor, Received, ServerStream, UserAgentInterceptor};
