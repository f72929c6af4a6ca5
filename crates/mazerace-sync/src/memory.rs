use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use tokio::sync::{Mutex, RwLock, broadcast, oneshot};
use tokio_stream::wrappers::BroadcastStream;

use mazerace_core::net::protocol::MAX_MESSAGE_SIZE;

use crate::channel::{Channel, ChannelError, Publication, PublishOptions, Subscription};

/// Per-topic fan-out buffer. Slow subscribers past this lag lose pushes.
const TOPIC_CAPACITY: usize = 256;

#[derive(Default)]
struct BrokerState {
    retained: HashMap<String, Vec<u8>>,
    topics: HashMap<String, broadcast::Sender<Publication>>,
}

/// In-process pub/sub hub with retain-latest topics.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<RwLock<BrokerState>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new client connection with its own subscriptions.
    pub fn connect(&self) -> MemoryClient {
        MemoryClient {
            broker: self.clone(),
            subscriptions: Mutex::new(HashMap::new()),
            drop_pushes: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn retained(&self, topic: &str) -> Option<Vec<u8>> {
        self.state.read().await.retained.get(topic).cloned()
    }
}

/// One client's view of a [`MemoryBroker`].
pub struct MemoryClient {
    broker: MemoryBroker,
    subscriptions: Mutex<HashMap<String, oneshot::Sender<()>>>,
    drop_pushes: Arc<AtomicBool>,
}

impl MemoryClient {
    /// While set, live pushes to this client are silently lost. Retained
    /// payloads stay fetchable, as on a flaky real connection.
    pub fn set_push_loss(&self, lossy: bool) {
        self.drop_pushes.store(lossy, Ordering::Relaxed);
    }
}

#[async_trait::async_trait]
impl Channel for MemoryClient {
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        options: PublishOptions,
    ) -> Result<(), ChannelError> {
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(ChannelError::PayloadTooLarge(payload.len()));
        }
        let mut state = self.broker.state.write().await;
        if options.retain {
            if payload.is_empty() {
                state.retained.remove(topic);
            } else {
                state.retained.insert(topic.to_string(), payload.clone());
            }
        }
        let delivered = state.topics.get(topic).map(|tx| {
            tx.send(Publication {
                topic: topic.to_string(),
                payload,
            })
        });
        // No live subscribers is not an error, but the fan-out is dropped.
        if let Some(Err(_)) = delivered {
            state.topics.remove(topic);
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, ChannelError> {
        let (rx, retained) = {
            let mut state = self.broker.state.write().await;
            state.topics.retain(|_, tx| tx.receiver_count() > 0);
            let rx = state
                .topics
                .entry(topic.to_string())
                .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
                .subscribe();
            (rx, state.retained.get(topic).cloned())
        };

        let (cancel_tx, cancel_rx) = oneshot::channel();
        // Replacing an older subscription to the same topic ends it.
        self.subscriptions
            .lock()
            .await
            .insert(topic.to_string(), cancel_tx);

        let owned_topic = topic.to_string();
        let initial = futures::stream::iter(retained.map(move |payload| Publication {
            topic: owned_topic,
            payload,
        }));
        let loss = Arc::clone(&self.drop_pushes);
        let live = BroadcastStream::new(rx).filter_map(move |item| {
            let delivered = match item {
                Ok(publication) if !loss.load(Ordering::Relaxed) => Some(publication),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "Subscriber lagged, pushes dropped");
                    None
                },
            };
            futures::future::ready(delivered)
        });
        Ok(Box::pin(initial.chain(live).take_until(cancel_rx)))
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), ChannelError> {
        self.subscriptions.lock().await.remove(topic);
        Ok(())
    }

    async fn fetch_latest(&self, topic: &str) -> Result<Option<Vec<u8>>, ChannelError> {
        Ok(self.broker.retained(topic).await)
    }
}
