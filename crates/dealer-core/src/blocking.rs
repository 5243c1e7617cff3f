//! Blocking calling convention.
//!
//! Every I/O operation in this workspace is written once as an `async fn`.
//! Blocking wrappers own a [`BlockingRuntime`] and drive those futures to
//! completion on the calling thread, so both conventions share one code path.

use std::future::Future;
use tokio::runtime::{Builder, Runtime};

/// A current-thread Tokio runtime owned by a blocking wrapper.
///
/// Calling [`BlockingRuntime::block_on`] from inside another Tokio runtime
/// panics; use the async API there instead.
pub struct BlockingRuntime {
    runtime: Runtime,
}

impl BlockingRuntime {
    pub fn new() -> std::io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { runtime })
    }

    /// Run `future` to completion, blocking the current thread.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

impl std::fmt::Debug for BlockingRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingRuntime").finish_non_exhaustive()
    }
}
