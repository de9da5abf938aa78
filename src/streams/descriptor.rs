//! Stream descriptor types

use crate::error::{Error, Result};
use crate::types::ReplicationMethod;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// How the request for a stream is filtered beyond paging and sorting
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestStyle {
    /// Only page size, page number and sort order
    #[default]
    Plain,

    /// Adds `dateFilter=<date_filter>` and `from=<starting point>`
    ModificationWindow {
        /// Value for the `dateFilter` query parameter
        date_filter: String,
    },
}

/// Immutable per-stream configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Unique stream name
    pub name: String,

    /// Resource path relative to the API root
    pub path: String,

    /// Fields identifying a record
    #[serde(default = "default_primary_keys")]
    pub primary_keys: Vec<String>,

    /// Field used for incremental extraction
    #[serde(default)]
    pub replication_key: Option<String>,

    /// JSONPath locating the record list in a page body
    pub records_path: String,

    /// Filter style
    #[serde(default)]
    pub style: RequestStyle,

    /// Related resources to embed (`expand` query parameter)
    #[serde(default)]
    pub expand: Vec<String>,

    /// JSON schema of a record
    #[serde(default = "default_schema")]
    pub schema: Value,
}

fn default_primary_keys() -> Vec<String> {
    vec!["id".to_string()]
}

fn default_schema() -> Value {
    json!({"type": "object", "additionalProperties": true})
}

impl StreamDescriptor {
    /// Create a full-table descriptor
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        records_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            primary_keys: default_primary_keys(),
            replication_key: None,
            records_path: records_path.into(),
            style: RequestStyle::Plain,
            expand: Vec::new(),
            schema: default_schema(),
        }
    }

    /// Make the stream incremental on `key`
    #[must_use]
    pub fn incremental(mut self, key: impl Into<String>) -> Self {
        self.replication_key = Some(key.into());
        self
    }

    /// Set the request style
    #[must_use]
    pub fn with_style(mut self, style: RequestStyle) -> Self {
        self.style = style;
        self
    }

    /// Set the expanded relations
    #[must_use]
    pub fn with_expand<I, S>(mut self, expand: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expand = expand.into_iter().map(Into::into).collect();
        self
    }

    /// Set the record schema
    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }

    /// Whether the stream is extracted incrementally
    pub fn is_incremental(&self) -> bool {
        self.replication_key.is_some()
    }

    /// Replication method implied by the replication key
    pub fn replication_method(&self) -> ReplicationMethod {
        if self.is_incremental() {
            ReplicationMethod::Incremental
        } else {
            ReplicationMethod::FullTable
        }
    }

    /// Check the descriptor is internally consistent
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("stream name must not be empty"));
        }
        if self.primary_keys.is_empty() {
            return Err(Error::config(format!(
                "stream '{}' has no primary keys",
                self.name
            )));
        }
        if self.records_path.trim().is_empty() {
            return Err(Error::config(format!(
                "stream '{}' has no records_path",
                self.name
            )));
        }
        if matches!(self.style, RequestStyle::ModificationWindow { .. }) && !self.is_incremental()
        {
            return Err(Error::config(format!(
                "stream '{}' filters on a modification window but has no replication_key",
                self.name
            )));
        }
        if !self.schema.is_object() {
            return Err(Error::config(format!(
                "stream '{}' schema must be a JSON object",
                self.name
            )));
        }
        Ok(())
    }
}
