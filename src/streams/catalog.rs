//! Stream catalog
//!
//! The built-in catalog is embedded in the binary and parsed once.

use super::descriptor::StreamDescriptor;
use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;

/// Built-in catalog YAML
pub const BUILTIN_CATALOG: &str = include_str!("catalog.yaml");

#[derive(Deserialize)]
struct CatalogFile {
    streams: Vec<StreamDescriptor>,
}

/// Ordered set of stream descriptors
#[derive(Debug, Clone)]
pub struct Catalog {
    streams: Vec<StreamDescriptor>,
}

impl Catalog {
    /// Parse the built-in catalog
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_CATALOG)
    }

    /// Parse a catalog from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::new(file.streams)
    }

    /// Build a catalog from descriptors, validating each
    pub fn new(streams: Vec<StreamDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for stream in &streams {
            stream.validate()?;
            if !seen.insert(stream.name.as_str()) {
                return Err(Error::config(format!(
                    "duplicate stream name '{}'",
                    stream.name
                )));
            }
        }
        Ok(Self { streams })
    }

    /// All streams in catalog order
    pub fn streams(&self) -> &[StreamDescriptor] {
        &self.streams
    }

    /// Stream names in catalog order
    pub fn names(&self) -> Vec<&str> {
        self.streams.iter().map(|s| s.name.as_str()).collect()
    }

    /// Look up a stream by name
    pub fn get(&self, name: &str) -> Result<&StreamDescriptor> {
        self.streams
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::StreamNotFound {
                stream: name.to_string(),
            })
    }

    /// Select streams from a comma-separated list, keeping catalog order
    ///
    /// `None` or an empty list selects every stream.
    pub fn select(&self, names: Option<&str>) -> Result<Vec<&StreamDescriptor>> {
        let wanted: Vec<&str> = names
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if wanted.is_empty() {
            return Ok(self.streams.iter().collect());
        }

        for name in &wanted {
            self.get(name)?;
        }

        Ok(self
            .streams
            .iter()
            .filter(|s| wanted.contains(&s.name.as_str()))
            .collect())
    }

    /// Discovery document describing every stream
    pub fn discover(&self) -> Value {
        let streams: Vec<Value> = self
            .streams
            .iter()
            .map(|s| {
                json!({
                    "tap_stream_id": s.name,
                    "stream": s.name,
                    "key_properties": s.primary_keys,
                    "replication_key": s.replication_key,
                    "replication_method": s.replication_method(),
                    "schema": s.schema,
                })
            })
            .collect();

        json!({ "streams": streams })
    }
}
