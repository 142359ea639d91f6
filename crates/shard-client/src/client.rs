use serde_json::Value;
use shard_common::gateway::{
    Ack, QueryRequest, QueryResponse, SendCommandRequest, StartEventStreamRequest,
    SubscribeEventsRequest, UnsubscribeEventsRequest, QUERY, SEND_COMMAND, START_EVENT_STREAM,
    SUBSCRIBE_EVENTS, UNSUBSCRIBE_EVENTS,
};
use shard_common::{Command, EventSubscription, Query, Result, ServiceAddress};

use crate::transport::{GatewayTransport, ServerStream};

/// Typed client for the shard gateway RPC surface.
///
/// Holds no per-call state: each method owns its request and response, and
/// subscriptions live entirely on the gateway.
#[derive(Clone)]
pub struct ShardClient {
    transport: GatewayTransport,
}

impl ShardClient {
    /// Create a new client for the gateway at `gateway_url`
    pub fn new(gateway_url: impl Into<String>, client_id: &str) -> Result<Self> {
        Ok(Self {
            transport: GatewayTransport::new(gateway_url, client_id)?,
        })
    }

    pub fn with_transport(transport: GatewayTransport) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &GatewayTransport {
        &self.transport
    }

    /// Send a command; success means the gateway accepted it, nothing more
    pub async fn send_command(&self, address: &ServiceAddress, command: Command) -> Result<()> {
        let request = SendCommandRequest {
            address: address.clone(),
            command,
        };
        let _: Ack = self.transport.unary(SEND_COMMAND, &request).await?;
        Ok(())
    }

    /// Run a query and return the matched entities in gateway order
    pub async fn query(&self, address: &ServiceAddress, query: Query) -> Result<Vec<Value>> {
        let request = QueryRequest {
            address: address.clone(),
            query,
        };
        let response: QueryResponse = self.transport.unary(QUERY, &request).await?;
        Ok(response.results.entities)
    }

    pub async fn subscribe_events(&self, subscriptions: Vec<EventSubscription>) -> Result<()> {
        let _: Ack = self
            .transport
            .unary(SUBSCRIBE_EVENTS, &SubscribeEventsRequest { subscriptions })
            .await?;
        Ok(())
    }

    pub async fn unsubscribe_events(&self, subscriptions: Vec<EventSubscription>) -> Result<()> {
        let _: Ack = self
            .transport
            .unary(UNSUBSCRIBE_EVENTS, &UnsubscribeEventsRequest { subscriptions })
            .await?;
        Ok(())
    }

    /// Open the live event stream. The first message it yields is the
    /// gateway's handshake frame, not an event.
    pub async fn start_event_stream(
        &self,
        subscriptions: Vec<EventSubscription>,
    ) -> Result<ServerStream> {
        self.transport
            .server_stream(START_EVENT_STREAM, &StartEventStreamRequest { subscriptions })
            .await
    }
}
