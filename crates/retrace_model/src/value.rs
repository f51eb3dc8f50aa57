//! Dynamic field value type.

use crate::field::FieldType;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A dynamic field value.
///
/// Values are totally ordered so the store can sort on any field. Variants
/// order as declared: `Null` sorts before everything else, then values of the
/// same variant compare by content.
///
/// Equality is structural. The diff engine relies on this: two records are
/// unchanged exactly when every field compares equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Null / unset.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Text string.
    Text(String),
    /// Byte string.
    Bytes(Vec<u8>),
    /// UUID.
    Uuid(Uuid),
    /// UTC timestamp.
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Returns the semantic type of this value, or `None` for `Null`.
    #[must_use]
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(FieldType::Bool),
            Value::Integer(_) => Some(FieldType::Integer),
            Value::Text(_) => Some(FieldType::Text),
            Value::Bytes(_) => Some(FieldType::Bytes),
            Value::Uuid(_) => Some(FieldType::Uuid),
            Value::Timestamp(_) => Some(FieldType::Timestamp),
        }
    }

    /// Check if this value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get this value as a boolean, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a string, if it is a text string.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as bytes, if it is a byte string.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get this value as a UUID, if it is one.
    #[must_use]
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Get this value as a timestamp, if it is one.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

/// Conversion from a [`Value`] into a concrete Rust type.
///
/// Returns `None` when the value has a different type. `Option<T>` maps
/// `Value::Null` to `Some(None)`.
pub trait FromValue: Sized {
    /// The field type this Rust type is stored as.
    const FIELD_TYPE: FieldType;

    /// Converts a value, returning `None` on type mismatch.
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for bool {
    const FIELD_TYPE: FieldType = FieldType::Bool;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for i64 {
    const FIELD_TYPE: FieldType = FieldType::Integer;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_integer()
    }
}

impl FromValue for i32 {
    const FIELD_TYPE: FieldType = FieldType::Integer;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_integer().and_then(|n| i32::try_from(n).ok())
    }
}

impl FromValue for u64 {
    const FIELD_TYPE: FieldType = FieldType::Integer;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_integer().and_then(|n| u64::try_from(n).ok())
    }
}

impl FromValue for String {
    const FIELD_TYPE: FieldType = FieldType::Text;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_text().map(str::to_string)
    }
}

impl FromValue for Vec<u8> {
    const FIELD_TYPE: FieldType = FieldType::Bytes;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bytes().map(<[u8]>::to_vec)
    }
}

impl FromValue for Uuid {
    const FIELD_TYPE: FieldType = FieldType::Uuid;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_uuid()
    }
}

impl FromValue for DateTime<Utc> {
    const FIELD_TYPE: FieldType = FieldType::Timestamp;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_timestamp()
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const FIELD_TYPE: FieldType = T::FIELD_TYPE;

    fn from_value(value: &Value) -> Option<Self> {
        if value.is_null() {
            Some(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn null_sorts_first() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut values = vec![Value::Timestamp(ts), Value::Integer(3), Value::Null];
        values.sort();
        assert_eq!(values[0], Value::Null);
    }

    #[test]
    fn timestamps_order_chronologically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap();
        assert!(Value::from(early) < Value::from(late));
    }

    #[test]
    fn field_types() {
        assert_eq!(Value::Null.field_type(), None);
        assert_eq!(Value::from(1i32).field_type(), Some(FieldType::Integer));
        assert_eq!(Value::from("x").field_type(), Some(FieldType::Text));
        assert_eq!(Value::from(Uuid::nil()).field_type(), Some(FieldType::Uuid));
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Option::<String>::from_value(&Value::Null), Some(None));
        assert_eq!(
            Option::<String>::from_value(&Value::from("a")),
            Some(Some("a".to_string()))
        );
        assert_eq!(Option::<String>::from_value(&Value::Integer(1)), None);
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn i32_out_of_range() {
        assert_eq!(i32::from_value(&Value::Integer(i64::MAX)), None);
        assert_eq!(i32::from_value(&Value::Integer(7)), Some(7));
    }

    #[test]
    fn serializes_untagged() {
        let json = serde_json::to_string(&Value::from("B")).unwrap();
        assert_eq!(json, "\"B\"");
        assert_eq!(serde_json::to_string(&Value::Null).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Value::Integer(10)).unwrap(), "10");
    }
}
