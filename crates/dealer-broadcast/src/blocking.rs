//! Blocking calling convention for [`ProcessBroadcaster`].

use crate::error::{BroadcastError, BroadcastResult};
use crate::message::BroadcastMessage;
use crate::process::{BroadcastState, ProcessBroadcaster};
use dealer_core::BlockingRuntime;
use std::panic::{self, AssertUnwindSafe};

/// Drives every [`ProcessBroadcaster`] operation to completion on the calling
/// thread and disconnects when dropped.
///
/// Must not be used, or dropped, from inside an async runtime.
#[derive(Debug)]
pub struct BlockingProcessBroadcaster {
    inner: ProcessBroadcaster,
    runtime: BlockingRuntime,
}

impl BlockingProcessBroadcaster {
    pub fn new(inner: ProcessBroadcaster) -> BroadcastResult<Self> {
        let runtime = BlockingRuntime::new().map_err(|e| {
            BroadcastError::Transport(format!("failed to start runtime: {}", e))
        })?;
        Ok(Self { inner, runtime })
    }

    pub fn get_ref(&self) -> &ProcessBroadcaster {
        &self.inner
    }

    pub fn set_broadcast_channel(&self, channel: impl Into<String>) {
        self.inner.set_broadcast_channel(channel);
    }

    pub fn broadcast_channel(&self) -> BroadcastResult<String> {
        self.inner.broadcast_channel()
    }

    pub fn state(&self) -> BroadcastState {
        self.inner.state()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    pub fn broadcast(&self, message: BroadcastMessage) -> BroadcastResult<BroadcastMessage> {
        self.runtime.block_on(self.inner.broadcast(message))
    }

    pub fn disconnect(&self) {
        self.runtime.block_on(self.inner.disconnect())
    }

    /// Run `job` and disconnect afterwards, even if it panics.
    pub fn run<T>(&self, job: impl FnOnce(&Self) -> T) -> T {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| job(self)));
        self.disconnect();

        match outcome {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}

impl Drop for BlockingProcessBroadcaster {
    fn drop(&mut self) {
        self.disconnect();
    }
}
