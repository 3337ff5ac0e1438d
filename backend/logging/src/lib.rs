//! Structured logging for the PageLens gateway.
//!
//! Wraps `tracing` to provide a console layer plus an optional daily-rolling
//! NDJSON file layer, with environment-based level control.

pub mod logger;

pub use logger::init_logger;
