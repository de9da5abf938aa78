//! Record extraction module
//!
//! Pulls the list of records out of a page body using the stream's
//! `records_path` and applies an optional per-record post-processing hook.

mod extractor;

pub use extractor::{PostProcessor, RecordExtractor};
