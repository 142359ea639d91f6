use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShardError {
    /// Wrong number of arguments; carries the usage line of the command.
    #[error("{0}")]
    InvalidUsage(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// A failure reported by the gateway itself (non-200 unary status or an
    /// error carried in the end-of-stream envelope).
    #[error("{code}: {message}")]
    Status { code: String, message: String },

    #[error("Failed to send {name} command: {reason}")]
    CommandRejected { name: String, reason: String },

    #[error("Failed to send query: {0}")]
    QueryFailed(String),

    #[error("Subscription failed: {0}")]
    SubscriptionFailed(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Failed to connect to broker: {0}")]
    BrokerUnreachable(String),

    #[error("Failed to create consumer: {0}")]
    ConsumerSetupFailed(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShardError {
    /// Usage and argument errors are reported bare, without a cause chain.
    pub fn is_usage(&self) -> bool {
        matches!(self, ShardError::InvalidUsage(_) | ShardError::InvalidArgument(_))
    }
}

impl From<prost::DecodeError> for ShardError {
    fn from(err: prost::DecodeError) -> Self {
        ShardError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShardError>;
