use crate::error::BroadcastResult;
use crate::message::BroadcastMessage;
use crate::transport::PubSubTransport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use validator::Validate;

/// Publishes [`BroadcastMessage`]s over a [`PubSubTransport`].
///
/// `connected` is tracked here, not queried from the transport. If the
/// transport drops the connection silently the flag stays set and the next
/// publish surfaces the transport's error; there is no reconnect.
pub struct Broadcaster {
    transport: Arc<dyn PubSubTransport>,
    connected: AtomicBool,
}

impl Broadcaster {
    pub fn new(transport: Arc<dyn PubSubTransport>) -> Self {
        Self {
            transport,
            connected: AtomicBool::new(false),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub async fn connect(&self) -> BroadcastResult<()> {
        self.transport.connect().await?;
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Close the transport. The flag is cleared even when closing fails.
    pub async fn disconnect(&self) -> BroadcastResult<()> {
        let result = self.transport.disconnect().await;
        self.connected.store(false, Ordering::SeqCst);
        result
    }

    /// Validate, serialize to JSON and publish on `channel`.
    ///
    /// An invalid message is rejected before the transport is touched.
    pub async fn publish(&self, channel: &str, message: &BroadcastMessage) -> BroadcastResult<()> {
        message.validate()?;
        let payload = serde_json::to_string(message)?;
        let size = payload.len();

        self.transport.publish(channel, payload).await.map_err(|e| {
            tracing::error!(
                error = %e,
                channel = %channel,
                process_id = %message.process_id,
                "Broadcast publish failed"
            );
            e
        })?;

        tracing::debug!(
            channel = %channel,
            process_id = %message.process_id,
            progress = message.progress,
            size_bytes = size,
            "Broadcast publish successful"
        );
        Ok(())
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BroadcastError;
    use crate::message::ProcessStatus;
    use crate::testing::{RecordingTransport, TransportCall};

    #[tokio::test]
    async fn test_publish_serializes_message_as_json() {
        let transport = Arc::new(RecordingTransport::default());
        let broadcaster = Broadcaster::new(transport.clone());
        let message = BroadcastMessage::new("job-7", ProcessStatus::Running, 25);

        broadcaster.publish("progress", &message).await.unwrap();

        let calls = transport.calls();
        let TransportCall::Publish { channel, payload } = &calls[0] else {
            panic!("expected a publish, got {:?}", calls);
        };
        assert_eq!(channel, "progress");
        let decoded: BroadcastMessage = serde_json::from_str(payload).unwrap();
        assert_eq!(decoded, message);
    }

    #[tokio::test]
    async fn test_invalid_message_never_reaches_transport() {
        let transport = Arc::new(RecordingTransport::default());
        let broadcaster = Broadcaster::new(transport.clone());
        let message = BroadcastMessage::new("job-7", ProcessStatus::Running, 250);

        let result = broadcaster.publish("progress", &message).await;

        assert!(matches!(result, Err(BroadcastError::ContractViolation(_))));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_disconnect_still_clears_flag() {
        let transport = Arc::new(RecordingTransport::failing_disconnect());
        let broadcaster = Broadcaster::new(transport);

        broadcaster.connect().await.unwrap();
        assert!(broadcaster.is_connected());

        assert!(broadcaster.disconnect().await.is_err());
        assert!(!broadcaster.is_connected());
    }
}
