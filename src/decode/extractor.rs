//! Record extractor implementation

use crate::error::{Error, Result};
use crate::http::PageResponse;
use crate::streams::StreamDescriptor;
use crate::types::Record;
use serde_json::Value;

/// Per-record transformation applied before a record leaves the extractor
///
/// Returning `None` drops the record.
pub trait PostProcessor: Send + Sync {
    /// Transform one record of `stream`
    fn process(&self, stream: &StreamDescriptor, record: Record) -> Option<Record>;
}

impl<F> PostProcessor for F
where
    F: Fn(&StreamDescriptor, Record) -> Option<Record> + Send + Sync,
{
    fn process(&self, stream: &StreamDescriptor, record: Record) -> Option<Record> {
        self(stream, record)
    }
}

/// Extracts records from page responses
#[derive(Default)]
pub struct RecordExtractor {
    post_processor: Option<Box<dyn PostProcessor>>,
}

impl RecordExtractor {
    /// Create an extractor that yields records unchanged
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor with a post-processing hook
    pub fn with_post_processor(processor: impl PostProcessor + 'static) -> Self {
        Self {
            post_processor: Some(Box::new(processor)),
        }
    }

    /// Records of one page, in the order the API returned them
    ///
    /// A 204 response yields nothing. The response itself is left untouched,
    /// so calling this again on the same response yields the same records.
    pub fn extract<'a>(
        &'a self,
        stream: &'a StreamDescriptor,
        response: &PageResponse,
    ) -> Result<impl Iterator<Item = Record> + 'a> {
        let records = if response.is_no_content() {
            Vec::new()
        } else {
            extract_records(response.json()?, &stream.records_path)?
        };

        Ok(records
            .into_iter()
            .filter_map(move |record| match &self.post_processor {
                Some(processor) => processor.process(stream, record),
                None => Some(record),
            }))
    }
}

impl std::fmt::Debug for RecordExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordExtractor")
            .field("has_post_processor", &self.post_processor.is_some())
            .finish()
    }
}

/// Locate the record list at `path` within `body`
pub fn extract_records(body: &Value, path: &str) -> Result<Vec<Value>> {
    if is_simple_path(path) {
        return match extract_simple_path(body, path) {
            Some(Value::Array(arr)) => Ok(arr),
            Some(Value::Null) | None => Ok(vec![]),
            Some(other) => Err(Error::RecordExtraction {
                path: path.to_string(),
                message: format!("expected an array, found {}", json_kind(&other)),
            }),
        };
    }
    extract_with_jsonpath(body, path)
}

/// Dot-separated field names, optionally ending in `[*]`
fn is_simple_path(path: &str) -> bool {
    let path = path.strip_prefix("$.").unwrap_or(path);
    let path = path.strip_suffix("[*]").unwrap_or(path);
    !path.is_empty()
        && path
            .split('.')
            .all(|part| !part.is_empty() && !part.contains(['[', ']', '*', '?', '@', '$']))
}

fn extract_simple_path(value: &Value, path: &str) -> Option<Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    let path = path.strip_suffix("[*]").unwrap_or(path);

    let mut current = value;
    for part in path.split('.') {
        current = current.get(part)?;
    }

    Some(current.clone())
}

/// Extract records using jsonpath-rust
fn extract_with_jsonpath(value: &Value, path: &str) -> Result<Vec<Value>> {
    use jsonpath_rust::JsonPath;

    let jp = JsonPath::try_from(path).map_err(|e| Error::JsonPath {
        message: format!("Invalid JSONPath '{path}': {e}"),
    })?;

    match jp.find(value) {
        Value::Array(arr) => Ok(arr),
        Value::Null => Ok(vec![]),
        other => Ok(vec![other]),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
