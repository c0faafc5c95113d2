// Debug module - Engine diagnostics
//
// Provides the log facility the engine and its subsystems report through.
// Logging is in-memory by default with an optional file sink, so the
// per-frame path never blocks on I/O unless a sink was opened.

mod logger;

pub use logger::{LogLevel, Logger};
