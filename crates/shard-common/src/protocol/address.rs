//! Shard addressing.
//!
//! A [`ServiceAddress`] names one shard. It is built once per process and
//! handed by reference to every RPC, and it also determines where the shard
//! publishes its epochs on the durable log.

use serde::{Deserialize, Serialize};

/// Realm a shard lives in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Realm {
    #[default]
    #[serde(rename = "REALM_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "REALM_WORLD")]
    World,
}

impl Realm {
    /// Lowercase token used when building broker subjects.
    pub fn as_subject_token(&self) -> &'static str {
        match self {
            Realm::Unspecified => "unspecified",
            Realm::World => "world",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAddress {
    pub realm: Realm,
    pub organization: String,
    pub project: String,
    pub service_id: String,
}

impl ServiceAddress {
    pub fn new(
        realm: Realm,
        organization: impl Into<String>,
        project: impl Into<String>,
        service_id: impl Into<String>,
    ) -> Self {
        Self {
            realm,
            organization: organization.into(),
            project: project.into(),
            service_id: service_id.into(),
        }
    }

    /// Subject of a named endpoint on this shard, e.g. `world.org.proj.svc.epoch`.
    pub fn endpoint(&self, endpoint: &str) -> String {
        format!(
            "{}.{}.{}.{}.{}",
            self.realm.as_subject_token(),
            self.organization,
            self.project,
            self.service_id,
            endpoint
        )
    }

    /// Name of the durable stream holding this shard's epochs.
    pub fn epoch_stream_name(&self) -> String {
        format!("{}_{}_{}_epoch", self.organization, self.project, self.service_id)
    }

    /// Filter subject of the epoch consumer.
    pub fn epoch_subject(&self) -> String {
        self.endpoint("epoch")
    }
}

impl Default for ServiceAddress {
    fn default() -> Self {
        Self::new(Realm::World, "organization", "project", "service")
    }
}
