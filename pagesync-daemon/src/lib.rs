//! Watch mode: a timer-driven scan loop with ctrl-c / broadcast shutdown.

mod error;
mod runtime;

pub use error::DaemonError;
pub use runtime::{init_tracing, run, start_blocking, WatchOptions, WatchSummary};
