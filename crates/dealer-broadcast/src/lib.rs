//! Media Dealer Broadcast Library
//!
//! Publishes job progress as JSON over a pub/sub channel. [`Broadcaster`]
//! validates and publishes; [`ProcessBroadcaster`] adds the per-job lifecycle
//! (lazy connect, guaranteed disconnect) and [`calculate_progress`] maps step
//! counts onto a bounded percentage.

pub mod blocking;
pub mod broadcaster;
pub mod error;
pub mod message;
pub mod process;
pub mod progress;
pub mod transport;

#[cfg(test)]
mod testing;

pub use blocking::BlockingProcessBroadcaster;
pub use broadcaster::Broadcaster;
pub use error::{BroadcastError, BroadcastResult};
pub use message::{BroadcastMessage, ProcessStatus};
pub use process::{BroadcastRecorder, BroadcastState, ProcessBroadcaster};
pub use progress::calculate_progress;
pub use transport::{LocalTransport, PubSubTransport, RedisTransport};
