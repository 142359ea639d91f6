//! Runtime settings.
//!
//! Every setting is taken from its command-line flag when given, then from
//! its environment variable, then from a built-in default.

use shard_client::epoch::{DEFAULT_NATS_PASSWORD, DEFAULT_NATS_URL, DEFAULT_NATS_USER};
use shard_client::transport::{validate_gateway_url, DEFAULT_CLIENT_ID};
use shard_client::BrokerConfig;
use shard_common::{Realm, Result, ServiceAddress};

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8080";

pub const ENV_CLIENT_ID: &str = "SHARD_CLIENT_ID";
pub const ENV_GATEWAY_URL: &str = "SHARD_GATEWAY_URL";
pub const ENV_NATS_URL: &str = "SHARD_NATS_URL";
pub const ENV_NATS_USER: &str = "SHARD_NATS_USER";
pub const ENV_NATS_PASSWORD: &str = "SHARD_NATS_PASSWORD";

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub client_id: Option<String>,
    pub gateway_url: Option<String>,
    pub nats_url: Option<String>,
    pub nats_user: Option<String>,
    pub nats_password: Option<String>,
    pub organization: Option<String>,
    pub project: Option<String>,
    pub service_id: Option<String>,
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub client_id: String,
    pub gateway_url: String,
    pub broker: BrokerConfig,
    pub address: ServiceAddress,
}

impl Settings {
    /// Resolves `overrides` against the process environment.
    pub fn from_env(overrides: Overrides) -> Result<Self> {
        Self::resolve(overrides, |key| std::env::var(key).ok())
    }

    /// Resolves `overrides` against `env`, which looks up one variable.
    ///
    /// # Errors
    ///
    /// Returns [`shard_common::ShardError::InvalidArgument`] if the resolved gateway URL
    /// is not an `http://` URL.
    pub fn resolve<E>(overrides: Overrides, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let pick = |flag: Option<String>, key: &str, default: &str| {
            flag.or_else(|| env(key)).unwrap_or_else(|| default.to_string())
        };

        let gateway_url = pick(overrides.gateway_url, ENV_GATEWAY_URL, DEFAULT_GATEWAY_URL);
        validate_gateway_url(&gateway_url)?;

        let defaults = ServiceAddress::default();
        let address = ServiceAddress::new(
            Realm::World,
            overrides.organization.unwrap_or(defaults.organization),
            overrides.project.unwrap_or(defaults.project),
            overrides.service_id.unwrap_or(defaults.service_id),
        );

        Ok(Self {
            client_id: pick(overrides.client_id, ENV_CLIENT_ID, DEFAULT_CLIENT_ID),
            gateway_url,
            broker: BrokerConfig {
                url: pick(overrides.nats_url, ENV_NATS_URL, DEFAULT_NATS_URL),
                user: pick(overrides.nats_user, ENV_NATS_USER, DEFAULT_NATS_USER),
                password: pick(overrides.nats_password, ENV_NATS_PASSWORD, DEFAULT_NATS_PASSWORD),
            },
            address,
        })
    }
}
