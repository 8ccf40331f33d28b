//! Shared utilities: tracing bootstrap and retry with backoff.

pub mod bootstrap;
pub mod retry;
