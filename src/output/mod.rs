//! Output module
//!
//! Singer-style messages and the sinks that receive them.
//!
//! # Overview
//!
//! - `Message` - `SCHEMA`, `RECORD` and `STATE` messages
//! - `MessageSink` - Receives messages one at a time
//! - `JsonLinesWriter` - Writes one JSON message per line to any writer

mod message;
mod sink;

pub use message::Message;
pub use sink::{JsonLinesWriter, MessageSink};
