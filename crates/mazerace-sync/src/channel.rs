use std::pin::Pin;

use futures::Stream;

/// Delivery options for one publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOptions {
    /// Keep this payload as the topic's latest value for later subscribers.
    /// An empty retained payload clears the topic.
    pub retain: bool,
}

impl PublishOptions {
    pub const RETAINED: Self = Self { retain: true };
    pub const TRANSIENT: Self = Self { retain: false };
}

/// One message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Stream of publications for one topic. Ends on unsubscribe.
pub type Subscription = Pin<Box<dyn Stream<Item = Publication> + Send>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    Closed,
    PayloadTooLarge(usize),
    Transport(String),
}

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "channel closed"),
            Self::PayloadTooLarge(size) => write!(f, "payload too large: {size} bytes"),
            Self::Transport(e) => write!(f, "transport error: {e}"),
        }
    }
}

impl std::error::Error for ChannelError {}

/// Topic-based pub/sub with retain-latest and at-least-once delivery.
///
/// Delivery may duplicate or drop pushes; `fetch_latest` is the recovery
/// path. A subscription first yields the retained payload, if any.
#[async_trait::async_trait]
pub trait Channel: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        options: PublishOptions,
    ) -> Result<(), ChannelError>;

    async fn subscribe(&self, topic: &str) -> Result<Subscription, ChannelError>;

    async fn unsubscribe(&self, topic: &str) -> Result<(), ChannelError>;

    /// Current retained payload of a topic.
    async fn fetch_latest(&self, topic: &str) -> Result<Option<Vec<u8>>, ChannelError>;
}
