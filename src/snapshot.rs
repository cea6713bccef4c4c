//! Structural snapshots of data values.
//!
//! A [`Snapshot`] is a comparable picture of a value at one point in time.
//! [`deep_equal`] compares two snapshots by structure rather than identity:
//! lists element-wise, records key-wise regardless of key order, dates by
//! instant. Anything doubtful compares unequal.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Clone, Debug)]
pub enum Snapshot {
    Null,
    Bool(bool),
    /// Integers and floats keep their own precision.
    Number(serde_json::Number),
    Text(String),
    Date(DateTime<Utc>),
    List(Vec<Snapshot>),
    Record(IndexMap<String, Snapshot>),
    /// A value that could not be captured. Never equal to anything, itself included.
    Opaque,
}

impl Snapshot {
    /// Capture any serializable value.
    ///
    /// Strings stay [`Snapshot::Text`] and compare exactly, even when they
    /// hold a timestamp. Values serde_json cannot represent become
    /// [`Snapshot::Opaque`].
    ///
    /// ```
    /// use query_kit::snapshot::{deep_equal, Snapshot};
    ///
    /// let a = Snapshot::capture(&("2024-05-01T12:00:00Z", vec![1, 2]));
    /// let b = Snapshot::capture(&("2024-05-01T12:00:00Z", vec![1, 2]));
    /// let c = Snapshot::capture(&("2024-05-01T14:00:00+02:00", vec![1, 2]));
    /// assert!(deep_equal(&a, &b));
    /// assert!(!deep_equal(&a, &c));
    /// ```
    pub fn capture<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => Snapshot::from(json),
            Err(e) => {
                debug!("Value not capturable, snapshot is opaque: {}", e);
                Snapshot::Opaque
            }
        }
    }
}

impl From<serde_json::Value> for Snapshot {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Snapshot::Null,
            Value::Bool(b) => Snapshot::Bool(b),
            Value::Number(n) => Snapshot::Number(n),
            Value::String(s) => Snapshot::Text(s),
            Value::Array(items) => Snapshot::List(items.into_iter().map(Snapshot::from).collect()),
            Value::Object(fields) => Snapshot::Record(
                fields
                    .into_iter()
                    .map(|(name, field)| (name, Snapshot::from(field)))
                    .collect(),
            ),
        }
    }
}

impl From<DateTime<Utc>> for Snapshot {
    fn from(date: DateTime<Utc>) -> Self {
        Snapshot::Date(date)
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        deep_equal(self, other)
    }
}

/// Structural equality of two snapshots.
pub fn deep_equal(a: &Snapshot, b: &Snapshot) -> bool {
    match (a, b) {
        (Snapshot::Null, Snapshot::Null) => true,
        (Snapshot::Bool(x), Snapshot::Bool(y)) => x == y,
        (Snapshot::Number(x), Snapshot::Number(y)) => numbers_equal(x, y),
        (Snapshot::Text(x), Snapshot::Text(y)) => x == y,
        (Snapshot::Date(x), Snapshot::Date(y)) => x == y,
        (Snapshot::List(xs), Snapshot::List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| deep_equal(x, y))
        }
        (Snapshot::Record(xs), Snapshot::Record(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(name, x)| ys.get(name).is_some_and(|y| deep_equal(x, y)))
        }
        _ => false,
    }
}

/// Exact numeric equality. Integers compare as integers; an integer equals a
/// float only when the float holds exactly that integer.
fn numbers_equal(x: &serde_json::Number, y: &serde_json::Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    match (x.is_f64(), y.is_f64()) {
        (true, true) => x.as_f64() == y.as_f64(),
        (true, false) => float_equals_integer(x, y),
        (false, true) => float_equals_integer(y, x),
        // one negative i64, one u64 beyond i64::MAX
        (false, false) => false,
    }
}

fn float_equals_integer(float: &serde_json::Number, int: &serde_json::Number) -> bool {
    let Some(f) = float.as_f64() else {
        return false;
    };
    if f.fract() != 0.0 {
        return false;
    }
    match (int.as_i64(), int.as_u64()) {
        (Some(i), _) => f >= i64::MIN as f64 && f < i64::MAX as f64 && f as i64 == i,
        (None, Some(u)) => f >= 0.0 && f < u64::MAX as f64 && f as u64 == u,
        _ => false,
    }
}
