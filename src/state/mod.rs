//! State management module
//!
//! Handles bookmark tracking, checkpointing, and resumability.
//! State is persisted between sync runs to enable incremental syncs.
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - The persisted bookmark document
//! - `StateManager` - File-based state persistence
//! - `ReplicationTracker` - Per-stream high-water marks and starting points

mod manager;
mod tracker;
mod types;

pub use manager::StateManager;
pub use tracker::{compare_bookmarks, ReplicationTracker, StartingPoint};
pub use types::{State, StreamBookmark};
