//! Lifecycle management around a [`Broadcaster`] for one long-running job.

use crate::blocking::BlockingProcessBroadcaster;
use crate::broadcaster::Broadcaster;
use crate::error::{BroadcastError, BroadcastResult};
use crate::message::BroadcastMessage;
use crate::transport::{PubSubTransport, RedisTransport};
use async_trait::async_trait;
use dealer_core::BroadcastSettings;
use futures::FutureExt;
use parking_lot::RwLock;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Best-effort hook run after every successful publish, e.g. to cache the
/// last message for late subscribers. Failures are logged and dropped.
#[async_trait]
pub trait BroadcastRecorder: Send + Sync {
    async fn record(&self, channel: &str, message: &BroadcastMessage) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastState {
    /// No channel set yet.
    Unconfigured,
    /// Channel set, never connected.
    Idle,
    Connected,
    /// Torn down after having been configured.
    Disconnected,
}

/// Owns the broadcast connection of a single job.
///
/// Connects lazily on the first broadcast and must be disconnected when the
/// job ends; [`ProcessBroadcaster::run`] does that on every exit path. Not
/// meant for concurrent broadcasts from several tasks.
pub struct ProcessBroadcaster {
    enabled: bool,
    channel: RwLock<Option<String>>,
    broadcaster: Broadcaster,
    recorder: Option<Arc<dyn BroadcastRecorder>>,
    torn_down: AtomicBool,
}

impl ProcessBroadcaster {
    /// `enabled = false` turns every broadcast into a no-op.
    pub fn new(transport: Arc<dyn PubSubTransport>, enabled: bool) -> Self {
        Self {
            enabled,
            channel: RwLock::new(None),
            broadcaster: Broadcaster::new(transport),
            recorder: None,
            torn_down: AtomicBool::new(false),
        }
    }

    /// Publish to the Redis broker named in configuration, honouring its
    /// enable switch. The broker is not contacted until the first broadcast.
    pub fn from_settings(settings: &BroadcastSettings) -> BroadcastResult<Self> {
        let transport = RedisTransport::new(settings.broker_url())?;
        Ok(Self::new(Arc::new(transport), settings.enabled))
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn BroadcastRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_channel(self, channel: impl Into<String>) -> Self {
        self.set_broadcast_channel(channel);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_connected(&self) -> bool {
        self.broadcaster.is_connected()
    }

    pub fn state(&self) -> BroadcastState {
        if self.channel.read().is_none() {
            BroadcastState::Unconfigured
        } else if self.is_connected() {
            BroadcastState::Connected
        } else if self.torn_down.load(Ordering::SeqCst) {
            BroadcastState::Disconnected
        } else {
            BroadcastState::Idle
        }
    }

    pub fn set_broadcast_channel(&self, channel: impl Into<String>) {
        *self.channel.write() = Some(channel.into());
    }

    /// The configured channel; reading it before it is set is a
    /// configuration error.
    pub fn broadcast_channel(&self) -> BroadcastResult<String> {
        self.channel.read().clone().ok_or_else(|| {
            BroadcastError::ConfigError("Must set broadcast channel before broadcast".to_string())
        })
    }

    /// Publish `message` on the configured channel and hand it back.
    ///
    /// Disabled broadcasters return the message untouched without any
    /// transport call.
    pub async fn broadcast(&self, message: BroadcastMessage) -> BroadcastResult<BroadcastMessage> {
        if !self.enabled {
            return Ok(message);
        }

        let channel = self.broadcast_channel()?;
        if !self.broadcaster.is_connected() {
            self.broadcaster.connect().await?;
            tracing::debug!(channel = %channel, "Process broadcaster connected");
        }
        self.broadcaster.publish(&channel, &message).await?;

        if let Some(recorder) = &self.recorder {
            if let Err(e) = recorder.record(&channel, &message).await {
                tracing::warn!(
                    error = %e,
                    channel = %channel,
                    process_id = %message.process_id,
                    "Broadcast recorder failed"
                );
            }
        }

        Ok(message)
    }

    /// Tear down the connection. Never fails: transport errors are logged
    /// and the connected flag is cleared regardless.
    pub async fn disconnect(&self) {
        if self.broadcaster.is_connected() {
            if let Err(e) = self.broadcaster.disconnect().await {
                tracing::warn!(error = %e, "Broadcast disconnect failed, ignoring");
            }
        }
        self.torn_down.store(true, Ordering::SeqCst);
    }

    /// Run `job`, then disconnect whether it returned normally, returned an
    /// error or panicked. A panic is resumed after teardown.
    pub async fn run<F, T>(&self, job: F) -> T
    where
        F: Future<Output = T>,
    {
        let outcome = AssertUnwindSafe(job).catch_unwind().await;
        self.disconnect().await;

        match outcome {
            Ok(value) => value,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Wrap in the blocking calling convention.
    pub fn into_blocking(self) -> BroadcastResult<BlockingProcessBroadcaster> {
        BlockingProcessBroadcaster::new(self)
    }
}

impl std::fmt::Debug for ProcessBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let channel = self.channel.read().clone();
        f.debug_struct("ProcessBroadcaster")
            .field("enabled", &self.enabled)
            .field("channel", &channel)
            .field("state", &self.state())
            .field("has_recorder", &self.recorder.is_some())
            .finish()
    }
}
