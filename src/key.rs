//! Query key composition.
//!
//! Every operation key has the shape `[namespace, operation, ...fragments]`.
//! The namespace-only key `[namespace]` is a strict prefix of every operation
//! key in that namespace, which is what makes bulk invalidation work.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Host-supplied remapping applied to every composed operation key.
pub type KeyTransform = Arc<dyn Fn(QueryKey) -> QueryKey + Send + Sync>;

/// Identity key transform (the default).
pub fn identity_transform() -> KeyTransform {
    Arc::new(|key| key)
}

/// One element of a query key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPart {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Null => write!(f, "null"),
            KeyPart::Bool(b) => write!(f, "{}", b),
            KeyPart::Int(i) => write!(f, "{}", i),
            KeyPart::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        KeyPart::Str(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        KeyPart::Str(value)
    }
}

impl From<&String> for KeyPart {
    fn from(value: &String) -> Self {
        KeyPart::Str(value.clone())
    }
}

impl From<bool> for KeyPart {
    fn from(value: bool) -> Self {
        KeyPart::Bool(value)
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        KeyPart::Int(value)
    }
}

impl From<i32> for KeyPart {
    fn from(value: i32) -> Self {
        KeyPart::Int(i64::from(value))
    }
}

impl From<u32> for KeyPart {
    fn from(value: u32) -> Self {
        KeyPart::Int(i64::from(value))
    }
}

impl<T: Into<KeyPart>> From<Option<T>> for KeyPart {
    fn from(value: Option<T>) -> Self {
        value.map_or(KeyPart::Null, Into::into)
    }
}

/// Ordered sequence identifying a cached result.
///
/// Equality is element-wise over the sequence, never by identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    pub fn new() -> Self {
        QueryKey(Vec::new())
    }

    /// Single-element key `[namespace]`.
    pub fn namespace(namespace: &str) -> Self {
        QueryKey(vec![KeyPart::from(namespace)])
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, part: impl Into<KeyPart>) {
        self.0.push(part.into());
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.push(part);
        self
    }

    /// True when `prefix` matches the leading elements of this key.
    ///
    /// Every key starts with itself and with the empty key.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// True when `self` is a prefix of `other` and strictly shorter.
    pub fn is_strict_prefix_of(&self, other: &QueryKey) -> bool {
        self.len() < other.len() && other.starts_with(self)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(":"))
    }
}

impl From<Vec<KeyPart>> for QueryKey {
    fn from(parts: Vec<KeyPart>) -> Self {
        QueryKey(parts)
    }
}

impl<P: Into<KeyPart>> FromIterator<P> for QueryKey {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        QueryKey(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a QueryKey {
    type Item = &'a KeyPart;
    type IntoIter = std::slice::Iter<'a, KeyPart>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Build a [`QueryKey`] from anything convertible into [`KeyPart`].
///
/// ```
/// use query_kit::{query_key, KeyPart};
///
/// let key = query_key!["users", "by_id", 7];
/// assert_eq!(key.parts()[2], KeyPart::Int(7));
/// ```
#[macro_export]
macro_rules! query_key {
    () => {
        $crate::key::QueryKey::new()
    };
    ($($part:expr),+ $(,)?) => {
        $crate::key::QueryKey::from(vec![$($crate::key::KeyPart::from($part)),+])
    };
}

/// Key composer.
pub struct QueryKeyBuilder;

impl QueryKeyBuilder {
    /// Compose `[namespace, operation, ...fragments]` and pass it through `transform`.
    ///
    /// Inputs are never mutated; the same inputs always yield an equal key.
    pub fn build(
        namespace: &str,
        operation: &str,
        fragments: &[KeyPart],
        transform: &KeyTransform,
    ) -> QueryKey {
        let mut parts = Vec::with_capacity(fragments.len() + 2);
        parts.push(KeyPart::from(namespace));
        parts.push(KeyPart::from(operation));
        parts.extend(fragments.iter().cloned());

        let key = transform(QueryKey(parts));
        debug!("Composed query key {}", key);
        key
    }

    /// The record-level `all` key. Not passed through any transform.
    pub fn all(namespace: &str) -> QueryKey {
        QueryKey::namespace(namespace)
    }
}
