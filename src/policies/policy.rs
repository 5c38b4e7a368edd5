//! Field and type policy configuration

use super::FieldContext;
use crate::graph::StoredValue;
use std::fmt;
use std::sync::Arc;

/// Custom read function
///
/// Receives the stored value (`None` when never written or deleted) and
/// returns the value to hand to the caller (`None` reports the field missing).
pub type ReadFn = Arc<
    dyn Fn(Option<&StoredValue>, &mut FieldContext<'_>) -> anyhow::Result<Option<StoredValue>>
        + Send
        + Sync,
>;

/// Custom merge function
///
/// Receives the existing and incoming values and returns the value to store.
/// The return value is the only mutation applied; a failing merge leaves the
/// store untouched.
pub type MergeFn = Arc<
    dyn Fn(Option<&StoredValue>, StoredValue, &mut FieldContext<'_>) -> anyhow::Result<StoredValue>
        + Send
        + Sync,
>;

/// Which arguments distinguish stored values of a field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KeyArgs {
    /// Not configured: all arguments, unless a read or merge function is set
    #[default]
    Unset,

    /// Key is the field name alone
    None,

    /// Only these arguments, in this order
    Names(Vec<String>),
}

impl KeyArgs {
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Names(names.into_iter().map(Into::into).collect())
    }
}

/// Per-(typename, field) policy
#[derive(Clone, Default)]
pub struct FieldPolicy {
    pub key_args: KeyArgs,
    pub read: Option<ReadFn>,
    pub merge: Option<MergeFn>,
}

impl FieldPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_args(mut self, key_args: KeyArgs) -> Self {
        self.key_args = key_args;
        self
    }

    pub fn read<F>(mut self, read: F) -> Self
    where
        F: Fn(Option<&StoredValue>, &mut FieldContext<'_>) -> anyhow::Result<Option<StoredValue>>
            + Send
            + Sync
            + 'static,
    {
        self.read = Some(Arc::new(read));
        self
    }

    pub fn merge<F>(mut self, merge: F) -> Self
    where
        F: Fn(Option<&StoredValue>, StoredValue, &mut FieldContext<'_>) -> anyhow::Result<StoredValue>
            + Send
            + Sync
            + 'static,
    {
        self.merge = Some(Arc::new(merge));
        self
    }

    /// Key arguments after applying the unset default
    ///
    /// Unset means every argument when the policy has no custom functions,
    /// and no arguments when it has a read or merge function.
    pub fn effective_key_args(&self) -> EffectiveKeyArgs<'_> {
        match &self.key_args {
            KeyArgs::None => EffectiveKeyArgs::None,
            KeyArgs::Names(names) => EffectiveKeyArgs::Names(names),
            KeyArgs::Unset if self.read.is_some() || self.merge.is_some() => EffectiveKeyArgs::None,
            KeyArgs::Unset => EffectiveKeyArgs::All,
        }
    }
}

/// Resolved key argument selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveKeyArgs<'a> {
    All,
    None,
    Names(&'a [String]),
}

impl fmt::Debug for FieldPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldPolicy")
            .field("key_args", &self.key_args)
            .field("read", &self.read.is_some())
            .field("merge", &self.merge.is_some())
            .finish()
    }
}

/// How record ids are derived for a typename
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KeyFields {
    /// `Typename:<id>` using the `id` field, falling back to `_id`
    #[default]
    Default,

    /// `Typename:{...}` from these fields, in this order
    Fields(Vec<String>),

    /// Never identified; objects of this type are embedded in their parent
    None,
}

/// Per-typename policy
#[derive(Debug, Clone, Default)]
pub struct TypePolicy {
    pub key_fields: KeyFields,
}

impl TypePolicy {
    pub fn new(key_fields: KeyFields) -> Self {
        Self { key_fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_defaults_to_all_without_functions() {
        let policy = FieldPolicy::new();
        assert_eq!(policy.effective_key_args(), EffectiveKeyArgs::All);
    }

    #[test]
    fn test_unset_defaults_to_none_with_functions() {
        let with_read = FieldPolicy::new().read(|existing, _| Ok(existing.cloned()));
        assert_eq!(with_read.effective_key_args(), EffectiveKeyArgs::None);

        let with_merge = FieldPolicy::new().merge(|_, incoming, _| Ok(incoming));
        assert_eq!(with_merge.effective_key_args(), EffectiveKeyArgs::None);
    }

    #[test]
    fn test_explicit_key_args_win() {
        let policy = FieldPolicy::new()
            .key_args(KeyArgs::names(["type"]))
            .merge(|_, incoming, _| Ok(incoming));

        let names = vec!["type".to_string()];
        assert_eq!(
            policy.effective_key_args(),
            EffectiveKeyArgs::Names(&names)
        );
    }

    #[test]
    fn test_debug_hides_functions() {
        let policy = FieldPolicy::new().read(|existing, _| Ok(existing.cloned()));
        let debug = format!("{:?}", policy);
        assert!(debug.contains("read: true"));
        assert!(debug.contains("merge: false"));
    }
}
