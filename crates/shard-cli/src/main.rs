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

//! # Shard CLI Entry Point
//!
//! ```bash
//! # One-shot calls
//! shard create-player alice
//! shard attack-player bob 150
//! shard query '{"find":["Health"],"match":"exact","where":""}'
//!
//! # Live events for one client identity
//! shard --id alice subscribe player-death
//! shard --id alice listen player-death
//!
//! # Durable epoch log
//! shard stream-epoch
//! ```
//!
//! Exits 0 on success or Ctrl+C, 1 on any error.

use std::io;
use std::process::ExitCode;

use argh::FromArgs;
use shard_cli::{Overrides, Settings};
use shard_client::{stream_epochs, Dispatcher, ShardClient};
use shard_common::{Intent, ShardError};

/// Command-line client for a game shard gateway
#[derive(FromArgs, Debug)]
struct Cli {
    /// client identifier sent as `User-Agent: client-{id}` (env SHARD_CLIENT_ID)
    #[argh(option)]
    id: Option<String>,

    /// gateway base URL, http:// only (env SHARD_GATEWAY_URL)
    #[argh(option, long = "gateway-url")]
    gateway_url: Option<String>,

    /// the JetStream broker URL (env SHARD_NATS_URL)
    #[argh(option, long = "nats-url")]
    nats_url: Option<String>,

    /// broker user name (env SHARD_NATS_USER)
    #[argh(option, long = "nats-user")]
    nats_user: Option<String>,

    /// broker password (env SHARD_NATS_PASSWORD)
    #[argh(option, long = "nats-password")]
    nats_password: Option<String>,

    /// organization part of the shard address
    #[argh(option)]
    organization: Option<String>,

    /// project part of the shard address
    #[argh(option)]
    project: Option<String>,

    /// service id part of the shard address
    #[argh(option, long = "service-id")]
    service_id: Option<String>,

    /// command followed by its arguments
    #[argh(positional, greedy)]
    intent: Vec<String>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            client_id: self.id.clone(),
            gateway_url: self.gateway_url.clone(),
            nats_url: self.nats_url.clone(),
            nats_user: self.nats_user.clone(),
            nats_password: self.nats_password.clone(),
            organization: self.organization.clone(),
            project: self.project.clone(),
            service_id: self.service_id.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli: Cli = argh::from_env();

    // Logs go to stderr; stdout carries only rendered output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<ShardError>() {
                Some(e) if e.is_usage() => eprintln!("{}", e),
                _ => eprintln!("Error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let intent = Intent::parse(&cli.intent)?;
    let settings = Settings::from_env(cli.overrides())?;
    tracing::debug!("Running {} as client {}", intent.command_type(), settings.client_id);

    match intent {
        Intent::StreamEpoch => {
            let mut out = io::stdout();
            let stats =
                stream_epochs(settings.broker, settings.address, &mut out, interrupted()).await?;
            tracing::debug!("Consumed {} epochs", stats.rendered);
        }
        intent => {
            let client = ShardClient::new(settings.gateway_url, &settings.client_id)?;
            let mut dispatcher = Dispatcher::new(client, settings.address, io::stdout());
            dispatcher.dispatch(&intent, interrupted()).await?;
        }
    }

    Ok(())
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Interrupted, shutting down");
}
