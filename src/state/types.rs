//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Complete state for a tap run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Per-stream bookmarks
    #[serde(default)]
    pub bookmarks: BTreeMap<String, StreamBookmark>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the bookmark for a stream
    pub fn get_bookmark(&self, stream: &str) -> Option<&StreamBookmark> {
        self.bookmarks.get(stream)
    }

    /// Set the bookmark for a stream
    pub fn set_bookmark(&mut self, stream: &str, bookmark: StreamBookmark) {
        self.bookmarks.insert(stream.to_string(), bookmark);
    }
}

/// Bookmark for a single stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamBookmark {
    /// Field the value was taken from
    pub replication_key: String,

    /// Highest value observed for `replication_key`
    pub replication_key_value: Value,
}

impl StreamBookmark {
    /// Create a bookmark
    pub fn new(replication_key: impl Into<String>, value: Value) -> Self {
        Self {
            replication_key: replication_key.into(),
            replication_key_value: value,
        }
    }

    /// The bookmark value as text, when it is a string
    pub fn value_str(&self) -> Option<&str> {
        self.replication_key_value.as_str()
    }
}
