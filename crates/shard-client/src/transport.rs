//! Gateway HTTP transport.
//!
//! Every call is an HTTP/1.1 POST to `{base_url}/gateway.v1.ShardService/{Method}`.
//! Unary calls carry a plain JSON body; server-streaming calls carry one
//! enveloped request and read back a sequence of envelopes (see
//! [`shard_common::transport`]).
//!
//! Outbound headers pass through a chain of [`Interceptor`]s before the
//! request is sent, for unary calls and for the stream handshake alike. The
//! transport always installs a [`UserAgentInterceptor`] built from the client
//! identifier it was constructed with.

use std::fmt::Display;
use std::sync::Arc;

use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes, Incoming};
use hyper::{Request, StatusCode};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use shard_common::gateway::{procedure_path, EndStream, RpcError};
use shard_common::transport::{Envelope, EnvelopeDecoder};
use shard_common::{Result, ShardError};

const CONNECT_PROTOCOL_VERSION: &str = "Connect-Protocol-Version";
const UNARY_CONTENT_TYPE: &str = "application/json";
const STREAM_CONTENT_TYPE: &str = "application/connect+json";

/// Client identifier used when none is configured.
pub const DEFAULT_CLIENT_ID: &str = "default";

/// Checks that `url` is a plain-HTTP gateway URL.
///
/// The connector speaks cleartext HTTP/1.1 only, so `https://` is refused up
/// front rather than failing on the first call.
///
/// # Errors
///
/// Returns [`ShardError::InvalidArgument`] for `https://` URLs and for URLs
/// without an `http://` prefix.
pub fn validate_gateway_url(url: &str) -> Result<()> {
    if url.starts_with("http://") {
        Ok(())
    } else if url.starts_with("https://") {
        Err(ShardError::InvalidArgument(format!(
            "gateway URL '{}' uses https://, which is not supported; use http://",
            url
        )))
    } else {
        Err(ShardError::InvalidArgument(format!(
            "gateway URL '{}' must start with http://",
            url
        )))
    }
}

/// Mutates the headers of every outbound request.
pub trait Interceptor: Send + Sync {
    fn intercept(&self, headers: &mut HeaderMap);
}

/// Tags requests with `User-Agent: client-{id}` so the gateway can attribute
/// load per logical client.
#[derive(Debug, Clone)]
pub struct UserAgentInterceptor {
    value: HeaderValue,
}

impl UserAgentInterceptor {
    /// # Errors
    ///
    /// Returns [`ShardError::InvalidArgument`] if the identifier cannot be
    /// carried in a header value.
    pub fn new(client_id: &str) -> Result<Self> {
        let value = HeaderValue::from_str(&format!("client-{}", client_id)).map_err(|e| {
            ShardError::InvalidArgument(format!("invalid client id '{}': {}", client_id, e))
        })?;
        Ok(Self { value })
    }
}

impl Interceptor for UserAgentInterceptor {
    fn intercept(&self, headers: &mut HeaderMap) {
        headers.insert(USER_AGENT, self.value.clone());
    }
}

/// HTTP transport to one gateway.
///
/// Cloning is cheap and clones share the underlying connection pool.
#[derive(Clone)]
pub struct GatewayTransport {
    base_url: String,
    http: Client<HttpConnector, Full<Bytes>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl GatewayTransport {
    /// Creates a transport for `base_url` identifying itself as `client_id`.
    pub fn new(base_url: impl Into<String>, client_id: &str) -> Result<Self> {
        let base_url = base_url.into();
        validate_gateway_url(&base_url)?;

        let http = Client::builder(TokioExecutor::new()).build_http();

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            interceptors: vec![Arc::new(UserAgentInterceptor::new(client_id)?)],
        })
    }

    /// Appends an interceptor; interceptors run in registration order.
    pub fn with_interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request(
        &self,
        method: &str,
        content_type: &'static str,
        body: Vec<u8>,
    ) -> Result<Request<Full<Bytes>>> {
        let uri = format!("{}{}", self.base_url, procedure_path(method));

        let mut request = Request::builder()
            .method("POST")
            .uri(&uri)
            .header(CONTENT_TYPE, content_type)
            .header(CONNECT_PROTOCOL_VERSION, "1")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| ShardError::Transport(format!("Failed to build request: {}", e)))?;

        for interceptor in &self.interceptors {
            interceptor.intercept(request.headers_mut());
        }

        Ok(request)
    }

    /// Sends a unary call and decodes its JSON response.
    ///
    /// # Errors
    ///
    /// - [`ShardError::Status`] if the gateway answered with an error body
    /// - [`ShardError::Transport`] for connection failures and malformed responses
    pub async fn unary<Req, Resp>(&self, method: &str, message: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_vec(message)?;
        let request = self.build_request(method, UNARY_CONTENT_TYPE, body)?;

        tracing::debug!("Sending unary call {}", method);
        let response = self
            .http
            .request(request)
            .await
            .map_err(|e| ShardError::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| ShardError::Transport(format!("Failed to read response: {}", e)))?
            .to_bytes();

        if status != StatusCode::OK {
            return Err(status_error(status, &body));
        }

        serde_json::from_slice(&body)
            .map_err(|e| ShardError::Transport(format!("Malformed {} response: {}", method, e)))
    }

    /// Opens a server-streaming call.
    ///
    /// Returns once response headers arrive; messages are read through
    /// [`ServerStream::receive`].
    pub async fn server_stream<Req: Serialize>(
        &self,
        method: &str,
        message: &Req,
    ) -> Result<ServerStream> {
        let body = Envelope::message(serde_json::to_vec(message)?).encode()?;
        let request = self.build_request(method, STREAM_CONTENT_TYPE, body)?;

        tracing::debug!("Opening server stream {}", method);
        let response = self
            .http
            .request(request)
            .await
            .map_err(|e| ShardError::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response
                .into_body()
                .collect()
                .await
                .map(|collected| collected.to_bytes())
                .unwrap_or_default();
            return Err(status_error(status, &body));
        }

        Ok(ServerStream::new(response.into_body()))
    }
}

fn status_error(status: StatusCode, body: &[u8]) -> ShardError {
    match serde_json::from_slice::<RpcError>(body) {
        Ok(err) => err.into(),
        Err(_) => ShardError::Transport(format!(
            "HTTP {}: {}",
            status,
            String::from_utf8_lossy(body)
        )),
    }
}

/// Outcome of one receive on a stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Received<T> {
    Message(T),
    /// Nothing ready yet; the stream is still open.
    Empty,
    /// The stream ended without error.
    Closed,
}

/// Response side of a server-streaming call.
pub struct ServerStream<B = Incoming> {
    body: B,
    decoder: EnvelopeDecoder,
    finished: bool,
}

impl<B> ServerStream<B>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: Display,
{
    pub fn new(body: B) -> Self {
        Self {
            body,
            decoder: EnvelopeDecoder::new(),
            finished: false,
        }
    }

    /// Reads body frames until one envelope completes, then reports it.
    ///
    /// Returns [`Received::Empty`] only for a frame that carries no data,
    /// such as trailers; a partially received envelope keeps reading.
    ///
    /// # Errors
    ///
    /// Read failures, malformed envelopes and errors carried in the
    /// end-of-stream envelope all end the stream with an error.
    pub async fn receive(&mut self) -> Result<Received<Value>> {
        loop {
            if self.finished {
                return Ok(Received::Closed);
            }

            if let Some(envelope) = self.decoder.next_envelope()? {
                return self.on_envelope(envelope);
            }

            match self.body.frame().await {
                Some(Ok(frame)) => match frame.into_data() {
                    Ok(data) => self.decoder.push(&data),
                    Err(_) => return Ok(Received::Empty),
                },
                Some(Err(e)) => {
                    self.finished = true;
                    return Err(ShardError::Transport(format!("Stream read failed: {}", e)));
                }
                None => {
                    self.finished = true;
                    return if self.decoder.buffered() > 0 {
                        Err(ShardError::Transport(
                            "Stream ended in the middle of a message".to_string(),
                        ))
                    } else {
                        Ok(Received::Closed)
                    };
                }
            }
        }
    }

    fn on_envelope(&mut self, envelope: Envelope) -> Result<Received<Value>> {
        if envelope.is_end_stream() {
            self.finished = true;
            let end: EndStream = if envelope.data.is_empty() {
                EndStream::default()
            } else {
                serde_json::from_slice(&envelope.data).map_err(|e| {
                    ShardError::Transport(format!("Malformed end-of-stream message: {}", e))
                })?
            };
            return match end.error {
                Some(err) => Err(err.into()),
                None => Ok(Received::Closed),
            };
        }

        serde_json::from_slice(&envelope.data)
            .map(Received::Message)
            .map_err(|e| ShardError::Transport(format!("Malformed stream message: {}", e)))
    }
}
