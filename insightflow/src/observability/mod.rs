//! Logging setup and timing helpers.

mod telemetry;
mod timer;

pub use telemetry::{init_tracing, parse_level};
pub use timer::SpanTimer;
