//! Entity capability traits.
//!
//! A tracked type implements [`Entity`] for its live rows and
//! [`HasHistory`] to name its history type. The history type implements
//! [`HistoryEntity`], whose `from_base` is the one place shared fields are
//! copied from a live entity into a snapshot.

use chrono::{DateTime, Utc};
use retrace_model::{FieldDef, FieldType, ModelResult, Record, Value};
use std::fmt;
use std::hash::Hash;
use uuid::Uuid;

/// Field holding the store-assigned history sequence.
pub const HISTORY_ID_FIELD: &str = "history_id";

/// Field holding the snapshot timestamp.
pub const CREATED_AT_FIELD: &str = "created_at";

/// Fields every history type declares in addition to the base fields.
pub const RESERVED_HISTORY_FIELDS: &[FieldDef] = &[
    FieldDef::new(HISTORY_ID_FIELD, FieldType::Integer),
    FieldDef::new(CREATED_AT_FIELD, FieldType::Timestamp).nullable(),
];

/// A type usable as an entity identity.
pub trait EntityKey: Clone + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static {
    /// Semantic type of the key field.
    const FIELD_TYPE: FieldType;

    /// Converts the key to a field value.
    fn to_value(&self) -> Value;

    /// Reads a key from a field value.
    fn from_value(value: &Value) -> Option<Self>;
}

impl EntityKey for i32 {
    const FIELD_TYPE: FieldType = FieldType::Integer;

    fn to_value(&self) -> Value {
        Value::from(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_integer().and_then(|v| i32::try_from(v).ok())
    }
}

impl EntityKey for i64 {
    const FIELD_TYPE: FieldType = FieldType::Integer;

    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_integer()
    }
}

impl EntityKey for String {
    const FIELD_TYPE: FieldType = FieldType::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_text().map(str::to_string)
    }
}

impl EntityKey for Uuid {
    const FIELD_TYPE: FieldType = FieldType::Uuid;

    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_uuid()
    }
}

/// Store-assigned identity of a history row.
///
/// Strictly increasing in insertion order across the whole store, so it
/// breaks ties between rows with equal `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HistoryId(u64);

impl HistoryId {
    /// Identity of a history row that has not been stored yet.
    pub const UNASSIGNED: Self = Self(0);

    /// Creates a history ID from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns true once the store has assigned this ID.
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for HistoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

impl From<u64> for HistoryId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A live, mutable domain record stored in a keyed table.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Identity type.
    type Key: EntityKey;

    /// Table holding live rows.
    const TABLE: &'static str;

    /// Field holding the identity.
    const KEY_FIELD: &'static str = "id";

    /// Declared fields, including the key field.
    fn schema() -> &'static [FieldDef];

    /// Returns the identity.
    fn key(&self) -> Self::Key;

    /// Converts to a field map containing every declared field.
    fn to_record(&self) -> Record;

    /// Reads back from a field map.
    fn from_record(record: &Record) -> ModelResult<Self>;
}

/// The "has history" capability of an entity type.
pub trait HasHistory: Entity {
    /// History type recording this entity's states.
    type History: HistoryEntity<Base = Self>;
}

/// An immutable snapshot of a base entity's fields.
///
/// The history schema must contain every base field with the same type plus
/// the [`RESERVED_HISTORY_FIELDS`].
pub trait HistoryEntity: Clone + fmt::Debug + Send + Sync + 'static {
    /// Base entity type.
    type Base: Entity;

    /// Append-only table holding history rows.
    const TABLE: &'static str;

    /// Declared fields.
    fn schema() -> &'static [FieldDef];

    /// Store-assigned identity.
    fn history_id(&self) -> HistoryId;

    /// Identity of the base entity this row belongs to.
    fn parent_key(&self) -> <Self::Base as Entity>::Key;

    /// When the snapshot was taken, if stamped.
    fn created_at(&self) -> Option<DateTime<Utc>>;

    /// Copies every shared field from `base` into a new, unstored snapshot.
    fn from_base(base: &Self::Base, created_at: Option<DateTime<Utc>>) -> Self;

    /// Builds a base entity from the shared fields.
    fn to_base(&self) -> Self::Base;

    /// Overwrites the mutable fields of `base` with the shared fields.
    fn apply_to(&self, base: &mut Self::Base);

    /// Converts to a field map containing every declared field.
    fn to_record(&self) -> Record;

    /// Reads back from a field map.
    fn from_record(record: &Record) -> ModelResult<Self>;
}
