//! Shared test doubles and utilities for the Herald workspace.

mod clock;
mod log;
mod operation;
mod tracing_capture;

pub use clock::FixedClock;
pub use log::InvocationLog;
pub use operation::RecordingOperation;
pub use tracing_capture::{CapturedRecord, LogCapture};
