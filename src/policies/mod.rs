//! Field policies
//!
//! Per-(typename, field) key derivation plus custom read/merge functions,
//! type policies for record identification, and the executor that runs them.

mod context;
mod executor;
pub mod pagination;
mod policy;
mod registry;

pub use context::{FieldContext, FieldStorage};
pub use executor::{FieldTarget, PolicyExecutor};
pub use policy::{EffectiveKeyArgs, FieldPolicy, KeyArgs, KeyFields, MergeFn, ReadFn, TypePolicy};
pub use registry::FieldPolicyRegistry;
