//! Shared foundations for the ringframe workspace.
//!
//! - [`Error`] and the [`Result`] alias used by setup code
//! - [`init_logging`] for the `tracing` subscriber
//! - [`EngineConfig`] and [`DriveMode`] for start-up configuration
//! - [`Timer`] and [`FrameRateCounter`] for pacing and telemetry

mod config;
mod error;
mod logging;
mod timer;

pub use config::{DriveMode, EngineConfig};
pub use error::{Error, Result};
pub use logging::{default_filter, init_logging};
pub use timer::{FrameRateCounter, Timer};
