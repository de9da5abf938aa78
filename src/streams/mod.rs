//! Stream definitions
//!
//! Each stream is described by an immutable [`StreamDescriptor`] loaded from
//! the built-in YAML catalog at startup.

mod catalog;
mod descriptor;

pub use catalog::{Catalog, BUILTIN_CATALOG};
pub use descriptor::{RequestStyle, StreamDescriptor};
