//! # tap-apaleo
//!
//! Incremental extraction connector for the Apaleo hotel-management API.
//!
//! ## Features
//!
//! - **Client-credentials auth**: One cached bearer token shared by every stream
//! - **Page-number pagination**: Driven by the `count` field of each page
//! - **Incremental sync**: Per-stream bookmarks on the replication key, resumable across runs
//! - **Singer output**: `SCHEMA`, `RECORD` and `STATE` messages as JSON lines
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tap_apaleo::{JsonLinesWriter, StateManager, SyncConfig, Tap, TapConfig};
//!
//! #[tokio::main]
//! async fn main() -> tap_apaleo::Result<()> {
//!     let config = TapConfig::from_file("config.json")?;
//!     let state = StateManager::from_file("state.json")?;
//!     let tap = Tap::new(config, state)?;
//!
//!     let mut sink = JsonLinesWriter::new(std::io::stdout());
//!     let report = tap.sync(Some("reservations"), SyncConfig::default(), &mut sink).await?;
//!     println!("{} records", report.total_records());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 Tap: check / discover / sync                 │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                     StreamRunner (per stream)
//!                               │
//! ┌─────────────┬─────────────┬─┴───────────┬────────────────────┐
//! │ PageFetcher │  Paginator  │  Extractor  │ ReplicationTracker │
//! ├─────────────┼─────────────┼─────────────┼────────────────────┤
//! │TokenProvider│ count-based │  JSONPath   │ StateManager       │
//! │ Transport   │ page numbers│ post-process│ bookmarks          │
//! └─────────────┴─────────────┴─────────────┴────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)] // TODO: document error variant fields, then drop this allow

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Tap configuration
pub mod config;

/// Client-credentials token provider
pub mod auth;

/// HTTP client, rate limiting and page fetching
pub mod http;

/// Stream descriptors and the built-in catalog
pub mod streams;

/// Page-number pagination
pub mod pagination;

/// Record extraction
pub mod decode;

/// State management and replication tracking
pub mod state;

/// Singer messages and sinks
pub mod output;

/// Per-stream pull loop
pub mod engine;

/// The tap: check, discover and sync
pub mod connector;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::TapConfig;
pub use connector::{CheckResult, SyncReport, Tap};
pub use engine::{StreamRunner, SyncConfig, SyncStats};
pub use output::{JsonLinesWriter, Message, MessageSink};
pub use state::{ReplicationTracker, StateManager};
pub use streams::{Catalog, StreamDescriptor};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
