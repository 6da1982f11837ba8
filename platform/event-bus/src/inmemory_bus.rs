//! In-memory implementation of the EventBus trait for testing and development

use crate::{validate_subject, BusMessage, BusResult, EventBus};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// EventBus implementation using in-memory channels
///
/// This implementation is suitable for:
/// - Unit tests (no external dependencies)
/// - Local development without a broker
/// - End-to-end tests wiring several services in one process
///
/// Messages are broadcast to every subscriber whose subject equals the
/// published subject. Subscribers only see messages published after they
/// subscribed.
///
/// # Example
/// ```rust
/// use event_bus::{EventBus, InMemoryBus};
/// use futures::StreamExt;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = InMemoryBus::new();
///
/// // Subscribe before publishing
/// let mut stream = bus.subscribe("auction.events.created").await?;
///
/// bus.publish("auction.events.created", b"hello".to_vec()).await?;
///
/// let msg = stream.next().await.unwrap();
/// assert_eq!(msg.subject, "auction.events.created");
/// assert_eq!(msg.payload, b"hello");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct InMemoryBus {
    // Global broadcast channel for all messages
    sender: Arc<broadcast::Sender<BusMessage>>,
    published: Arc<AtomicU64>,
}

impl InMemoryBus {
    /// Create a new in-memory event bus
    ///
    /// The bus uses a broadcast channel with a buffer of 1000 messages.
    /// If this buffer is exceeded, lagging subscribers skip the oldest messages.
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    /// Create a new in-memory event bus with a custom buffer size
    pub fn with_capacity(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        Self {
            sender: Arc::new(sender),
            published: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Total number of messages published through this bus
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()> {
        validate_subject(subject)?;

        let msg = BusMessage::new(subject.to_string(), payload);
        self.published.fetch_add(1, Ordering::SeqCst);

        // No receivers is fine: nobody has subscribed to anything yet
        let _ = self.sender.send(msg);

        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> BusResult<BoxStream<'static, BusMessage>> {
        validate_subject(subject)?;

        let mut receiver = self.sender.subscribe();
        let subject = subject.to_string();

        let stream = async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(msg) => {
                        if msg.subject == subject {
                            yield msg;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            subject = %subject,
                            skipped = skipped,
                            "InMemoryBus subscriber lagged, messages skipped"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        };

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BusError;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn test_publish_and_subscribe() {
        let bus = InMemoryBus::new();

        let mut stream = bus.subscribe("auction.events.created").await.unwrap();

        let payload = b"test message".to_vec();
        bus.publish("auction.events.created", payload.clone())
            .await
            .unwrap();

        let msg = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("timeout")
            .expect("stream ended");

        assert_eq!(msg.subject, "auction.events.created");
        assert_eq!(msg.payload, payload);
        assert_eq!(bus.published_count(), 1);
    }

    #[tokio::test]
    async fn test_multiple_messages_in_order() {
        let bus = InMemoryBus::new();
        let mut stream = bus.subscribe("auction.events.updated").await.unwrap();

        for i in 0..5 {
            let payload = format!("message {}", i).into_bytes();
            bus.publish("auction.events.updated", payload).await.unwrap();
        }

        for i in 0..5 {
            let msg = tokio::time::timeout(Duration::from_secs(1), stream.next())
                .await
                .expect("timeout")
                .expect("stream ended");

            assert_eq!(msg.payload, format!("message {}", i).into_bytes());
        }
    }

    #[tokio::test]
    async fn test_exact_subject_routing() {
        let bus = InMemoryBus::new();

        let mut stream = bus.subscribe("auction.events.created").await.unwrap();

        bus.publish("auction.events.created", b"match".to_vec())
            .await
            .unwrap();
        bus.publish("auction.events.created.v2", b"no match".to_vec())
            .await
            .unwrap();
        bus.publish("fault.auction.events.created", b"no match".to_vec())
            .await
            .unwrap();

        let msg = tokio::time::timeout(Duration::from_millis(100), stream.next())
            .await
            .expect("timeout")
            .expect("stream ended");
        assert_eq!(msg.payload, b"match");

        let result = tokio::time::timeout(Duration::from_millis(100), stream.next()).await;
        assert!(result.is_err(), "should timeout, no more messages");
    }

    #[tokio::test]
    async fn test_wildcard_subscription_rejected() {
        let bus = InMemoryBus::new();

        for pattern in ["auction.events.*", "auction.>", ">"] {
            match bus.subscribe(pattern).await {
                Err(BusError::InvalidSubject(_)) => {}
                Err(other) => panic!("unexpected error for {}: {}", pattern, other),
                Ok(_) => panic!("wildcard {} should be rejected", pattern),
            }
        }
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = InMemoryBus::new();

        let mut stream1 = bus.subscribe("auction.events.deleted").await.unwrap();
        let mut stream2 = bus.subscribe("auction.events.deleted").await.unwrap();

        let payload = b"broadcast".to_vec();
        bus.publish("auction.events.deleted", payload.clone())
            .await
            .unwrap();

        let msg1 = tokio::time::timeout(Duration::from_secs(1), stream1.next())
            .await
            .expect("timeout")
            .expect("stream ended");
        let msg2 = tokio::time::timeout(Duration::from_secs(1), stream2.next())
            .await
            .expect("timeout")
            .expect("stream ended");

        assert_eq!(msg1.payload, payload);
        assert_eq!(msg2.payload, payload);
    }
}
