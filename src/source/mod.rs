//! Input source documents.
//!
//! A document is decoded once per invocation from a YAML or JSON file and is
//! read-only afterwards. Flags look up their values by dotted name.

mod document;
mod format;

pub use document::{Document, PATH_SEPARATOR};
pub use format::FileFormat;
