//! Replication tracking
//!
//! Keeps the highest replication-key value seen per stream during a run and
//! decides where the next run starts.

use super::manager::StateManager;
use super::types::StreamBookmark;
use crate::config::{format_timestamp, parse_start_date, TapConfig};
use crate::error::Result;
use crate::streams::StreamDescriptor;
use crate::types::Record;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Where an incremental stream starts reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartingPoint {
    timestamp: DateTime<Utc>,
    from_bookmark: bool,
    verbatim: Option<String>,
}

impl StartingPoint {
    fn start_date(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            from_bookmark: false,
            verbatim: None,
        }
    }

    /// Instant the stream starts from
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether this came from a persisted bookmark rather than `start_date`
    pub fn is_from_bookmark(&self) -> bool {
        self.from_bookmark
    }

    /// Value for the `from` query parameter
    ///
    /// A bookmark used as-is is sent exactly as it was stored.
    pub fn as_param(&self) -> String {
        self.verbatim
            .clone()
            .unwrap_or_else(|| format_timestamp(&self.timestamp))
    }
}

/// Tracks per-stream bookmarks for one run
#[derive(Debug)]
pub struct ReplicationTracker {
    state: StateManager,
    start_date: DateTime<Utc>,
    lookback: chrono::Duration,
    observed: HashMap<String, Value>,
}

impl ReplicationTracker {
    /// Create a tracker over `state`
    pub fn new(state: StateManager, start_date: DateTime<Utc>) -> Self {
        Self {
            state,
            start_date,
            lookback: chrono::Duration::zero(),
            observed: HashMap::new(),
        }
    }

    /// Create a tracker using the start date and look-back from `config`
    pub fn from_config(config: &TapConfig, state: StateManager) -> Self {
        Self::new(state, config.start_date).with_lookback(config.lookback())
    }

    /// Subtract `lookback` from persisted bookmarks when starting
    #[must_use]
    pub fn with_lookback(mut self, lookback: chrono::Duration) -> Self {
        self.lookback = lookback;
        self
    }

    /// The underlying state manager
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Starting point for `stream`, or `None` for full-table streams
    pub async fn starting_point(&self, stream: &StreamDescriptor) -> Option<StartingPoint> {
        let key = stream.replication_key.as_deref()?;

        let Some(bookmark) = self.state.get_bookmark(&stream.name).await else {
            return Some(StartingPoint::start_date(self.start_date));
        };

        if bookmark.replication_key != key {
            warn!(
                stream = %stream.name,
                stored_key = %bookmark.replication_key,
                key,
                "Bookmark was recorded for a different replication key, using start_date"
            );
            return Some(StartingPoint::start_date(self.start_date));
        }

        let parsed = bookmark
            .value_str()
            .and_then(|raw| parse_start_date(raw).ok().map(|ts| (raw, ts)));

        let Some((raw, timestamp)) = parsed else {
            warn!(
                stream = %stream.name,
                value = %bookmark.replication_key_value,
                "Bookmark is not a timestamp, using start_date"
            );
            return Some(StartingPoint::start_date(self.start_date));
        };

        if self.lookback.is_zero() {
            return Some(StartingPoint {
                timestamp,
                from_bookmark: true,
                verbatim: Some(raw.to_string()),
            });
        }

        let timestamp = (timestamp - self.lookback).max(self.start_date);
        Some(StartingPoint {
            timestamp,
            from_bookmark: true,
            verbatim: None,
        })
    }

    /// Advance the in-memory bookmark for `stream` from one emitted record
    ///
    /// Records without the replication key, or with a null value, are
    /// ignored. Returns whether the bookmark moved.
    pub fn observe(&mut self, stream: &StreamDescriptor, record: &Record) -> bool {
        let Some(key) = stream.replication_key.as_deref() else {
            return false;
        };
        let value = match record.get(key) {
            None | Some(Value::Null) => return false,
            Some(value) => value,
        };

        match self.observed.get(&stream.name) {
            None => {}
            Some(current) => match compare_bookmarks(value, current) {
                Some(Ordering::Greater) => {}
                Some(_) => return false,
                None => {
                    debug!(stream = %stream.name, %value, %current, "Incomparable replication value ignored");
                    return false;
                }
            },
        }

        self.observed.insert(stream.name.clone(), value.clone());
        true
    }

    /// Highest value observed for `stream` in this run
    pub fn current(&self, stream: &str) -> Option<&Value> {
        self.observed.get(stream)
    }

    /// Write the bookmark for `stream` to the state document
    ///
    /// The stored value never moves backwards. Returns the bookmark now in
    /// state, if any.
    pub async fn persist(&self, stream: &StreamDescriptor) -> Result<Option<StreamBookmark>> {
        let Some(key) = stream.replication_key.as_deref() else {
            return Ok(None);
        };
        let stored = self.state.get_bookmark(&stream.name).await;
        let Some(observed) = self.observed.get(&stream.name) else {
            return Ok(stored);
        };

        if let Some(stored) = stored.as_ref().filter(|b| b.replication_key == key) {
            if matches!(
                compare_bookmarks(observed, &stored.replication_key_value),
                Some(Ordering::Less | Ordering::Equal)
            ) {
                return Ok(Some(stored.clone()));
            }
        }

        let bookmark = StreamBookmark::new(key, observed.clone());
        debug!(stream = %stream.name, value = %bookmark.replication_key_value, "Persisting bookmark");
        self.state.set_bookmark(&stream.name, bookmark.clone()).await?;
        Ok(Some(bookmark))
    }
}

/// Order two replication values
///
/// Numbers compare numerically, RFC 3339 strings compare as instants and
/// other strings compare lexicographically. Anything else is incomparable.
pub fn compare_bookmarks(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => Some(x.cmp(&y)),
                _ => Some(x.cmp(y)),
            }
        }
        _ => None,
    }
}
