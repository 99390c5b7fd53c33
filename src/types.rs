//! Small string-handling primitives shared across the scenario format.
//!
//! Config fields arrive as plain JSON strings but need consistent trimming
//! and case handling before they're used as HTTP methods, header values, or
//! template operands. `ConfigStr` centralises that so call sites don't
//! re-derive the same `.trim().to_string()` dance.

/// A config-sourced string with trim/case helpers.
///
/// Cheap to construct and clone; wraps an owned `String` rather than
/// borrowing so it can live on deserialised structs without lifetimes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct ConfigStr(String);

impl ConfigStr {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn trimmed(&self) -> String {
        self.0.trim().to_string()
    }

    pub fn to_uppercase(&self) -> String {
        self.0.to_uppercase()
    }

    /// Trimmed and upper-cased, the form used for HTTP methods.
    pub fn trimmed_upper(&self) -> String {
        self.0.trim().to_uppercase()
    }
}

/// A literal match-token/replacement pair used by the template resolver.
///
/// Static variables, parsed `{%ENV...%}` lookups, and resolved `{%PATH...%}`
/// / `{%RESP...%}` occurrences are all, ultimately, one of these: replace
/// every occurrence of `key()` in a string with `value()`.
pub trait KeyValue {
    fn key(&self) -> &str;
    fn value(&self) -> &str;
}

/// Replace every occurrence of every pair's key with its value.
///
/// Pairs are applied in order; a later pair's key could in principle match
/// text introduced by an earlier pair's value, but the resolver is
/// structured (see `template`) so that never happens across dialects within
/// one pass.
pub fn replace_key_by_value<T: KeyValue>(pairs: &[T], data: &str) -> String {
    if pairs.is_empty() {
        return data.to_string();
    }

    let mut out = data.to_string();
    for pair in pairs {
        out = out.replace(pair.key(), pair.value());
    }
    out
}
