use crate::error::{BroadcastError, BroadcastResult};
use crate::transport::PubSubTransport;
use async_trait::async_trait;
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Connect,
    Publish { channel: String, payload: String },
    Disconnect,
}

/// Transport double that records calls and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<TransportCall>>,
    fail_disconnect: bool,
    fail_publish: bool,
}

impl RecordingTransport {
    pub fn failing_disconnect() -> Self {
        Self {
            fail_disconnect: true,
            ..Self::default()
        }
    }

    pub fn failing_publish() -> Self {
        Self {
            fail_publish: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: fn(&TransportCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| call(c)).count()
    }
}

#[async_trait]
impl PubSubTransport for RecordingTransport {
    async fn connect(&self) -> BroadcastResult<()> {
        self.calls.lock().push(TransportCall::Connect);
        Ok(())
    }

    async fn disconnect(&self) -> BroadcastResult<()> {
        self.calls.lock().push(TransportCall::Disconnect);
        if self.fail_disconnect {
            return Err(BroadcastError::Transport("connection reset by peer".to_string()));
        }
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: String) -> BroadcastResult<()> {
        self.calls.lock().push(TransportCall::Publish {
            channel: channel.to_string(),
            payload,
        });
        if self.fail_publish {
            return Err(BroadcastError::Transport("broken pipe".to_string()));
        }
        Ok(())
    }
}

pub fn is_connect(call: &TransportCall) -> bool {
    matches!(call, TransportCall::Connect)
}

pub fn is_publish(call: &TransportCall) -> bool {
    matches!(call, TransportCall::Publish { .. })
}

pub fn is_disconnect(call: &TransportCall) -> bool {
    matches!(call, TransportCall::Disconnect)
}
