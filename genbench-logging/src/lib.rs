//! Logging initialisation for genbench
//!
//! Builds a `tracing` subscriber from [`LoggingConfig`]: one formatting
//! layer per configured target, all behind a shared `EnvFilter`.

mod init;

pub use init::{init_logging, init_simple_tracing, level_filter, LoggingGuard};
