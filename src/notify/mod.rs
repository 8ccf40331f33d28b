//! Notifier implementations.
//!
//! - `LoggingNotifier`: writes each signal to the log
//! - `ChannelNotifier`: broadcasts signals to in-process subscribers

mod channel;
mod logging;

pub use channel::{ChannelNotifier, ContentNotification};
pub use logging::LoggingNotifier;
