//! Static field declarations.

use std::fmt;

/// Semantic type of a field.
///
/// Two fields have the same semantic type when their `FieldType` and
/// nullability both match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldType {
    /// Boolean.
    Bool,
    /// Signed 64-bit integer (also used for smaller integer keys).
    Integer,
    /// UTF-8 text.
    Text,
    /// Raw bytes.
    Bytes,
    /// 128-bit UUID.
    Uuid,
    /// UTC timestamp.
    Timestamp,
}

impl FieldType {
    /// Returns the lowercase name of the type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::Integer => "integer",
            FieldType::Text => "text",
            FieldType::Bytes => "bytes",
            FieldType::Uuid => "uuid",
            FieldType::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declaration of a single field of an entity type.
///
/// Entity types declare their fields as a `const` slice so that schema
/// checks can run once at startup without touching any instance.
///
/// ```
/// use retrace_model::{FieldDef, FieldType};
///
/// const FIELDS: &[FieldDef] = &[
///     FieldDef::new("id", FieldType::Integer),
///     FieldDef::new("description", FieldType::Text).nullable(),
/// ];
/// assert!(FIELDS[1].nullable);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldDef {
    /// Field name.
    pub name: &'static str,
    /// Semantic type.
    pub ty: FieldType,
    /// Whether the field may hold `Value::Null`.
    pub nullable: bool,
}

impl FieldDef {
    /// Declares a non-nullable field.
    #[must_use]
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
        }
    }

    /// Marks the field as nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Returns true if `other` has the same semantic type.
    #[must_use]
    pub fn same_type_as(&self, other: &FieldDef) -> bool {
        self.ty == other.ty && self.nullable == other.nullable
    }
}

impl fmt::Display for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "{} {}?", self.ty, self.name)
        } else {
            write!(f, "{} {}", self.ty, self.name)
        }
    }
}

/// Finds a field by name in a declaration slice.
#[must_use]
pub fn find_field<'a>(fields: &'a [FieldDef], name: &str) -> Option<&'a FieldDef> {
    fields.iter().find(|f| f.name == name)
}
