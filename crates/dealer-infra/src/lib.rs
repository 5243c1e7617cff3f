//! Media Dealer Infrastructure Library
//!
//! Process-wide concerns shared by the binaries: telemetry initialization.

pub mod telemetry;

pub use telemetry::{init_telemetry, LogFormat};
