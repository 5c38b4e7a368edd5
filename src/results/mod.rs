//! Result trees, their memoization and structural sharing

mod canon;
mod result_cache;
mod tree;

pub use canon::Canonicalizer;
pub use result_cache::{CachedResult, ResultCache};
pub use tree::{FieldSelection, MissingField, ReadResult, ResultObject, ResultValue, Selection};
