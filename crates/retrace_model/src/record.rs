//! Named field maps.

use crate::error::{ModelError, ModelResult};
use crate::field::FieldDef;
use crate::value::{FromValue, Value};
use serde::Serialize;
use std::collections::BTreeMap;

/// A set of named field values.
///
/// Records are the unit the store persists and the engine snapshots. Fields
/// are kept sorted by name so that two records with the same content have the
/// same iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field assignment.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Sets a field, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns a field value, or an error if it is absent or null.
    pub fn require(&self, name: &str) -> ModelResult<&Value> {
        match self.fields.get(name) {
            Some(v) if !v.is_null() => Ok(v),
            _ => Err(ModelError::missing_field(name)),
        }
    }

    /// Reads a field as a concrete type.
    ///
    /// A missing field reads as `Value::Null`, so `Option<T>` targets accept
    /// it and every other target reports [`ModelError::MissingField`].
    pub fn get_as<T: FromValue>(&self, name: &str) -> ModelResult<T> {
        let value = self.fields.get(name).unwrap_or(&Value::Null);
        match T::from_value(value) {
            Some(v) => Ok(v),
            None => match value.field_type() {
                Some(found) => Err(ModelError::field_type(name, T::FIELD_TYPE, found)),
                None => Err(ModelError::missing_field(name)),
            },
        }
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Returns true if the record has a field with this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Returns a copy containing only the declared fields.
    ///
    /// Declared fields absent from `self` are filled with `Value::Null`.
    #[must_use]
    pub fn project(&self, fields: &[FieldDef]) -> Record {
        fields
            .iter()
            .map(|f| {
                let value = self.fields.get(f.name).cloned().unwrap_or(Value::Null);
                (f.name.to_string(), value)
            })
            .collect()
    }

    /// Names of the fields of `self` whose value differs in `other`.
    ///
    /// Only fields present in `self` are compared; a field missing from
    /// `other` compares as `Value::Null`.
    #[must_use]
    pub fn changed_fields<'a>(&'a self, other: &Record) -> Vec<&'a str> {
        self.fields
            .iter()
            .filter(|(name, value)| other.get(name).unwrap_or(&Value::Null) != *value)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Checks every declared field against its declared type.
    ///
    /// Extra fields in the record are ignored.
    pub fn check_against(&self, fields: &[FieldDef]) -> ModelResult<()> {
        for def in fields {
            let value = self.fields.get(def.name).unwrap_or(&Value::Null);
            match value.field_type() {
                None if def.nullable => {}
                None => return Err(ModelError::missing_field(def.name)),
                Some(found) if found != def.ty => {
                    return Err(ModelError::field_type(def.name, def.ty, found));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use proptest::prelude::*;

    fn product(name: &str, price: i64) -> Record {
        Record::new()
            .with("id", 1i32)
            .with("name", name)
            .with("price", price)
    }

    #[test]
    fn typed_access() {
        let record = product("A", 10);
        assert_eq!(record.get_as::<i32>("id").unwrap(), 1);
        assert_eq!(record.get_as::<String>("name").unwrap(), "A");
        assert_eq!(record.get_as::<Option<String>>("description").unwrap(), None);
    }

    #[test]
    fn typed_access_errors() {
        let record = product("A", 10);
        assert_eq!(
            record.get_as::<String>("price"),
            Err(ModelError::field_type("price", FieldType::Text, FieldType::Integer))
        );
        assert_eq!(
            record.get_as::<String>("description"),
            Err(ModelError::missing_field("description"))
        );
    }

    #[test]
    fn require_rejects_null() {
        let record = Record::new().with("a", Value::Null);
        assert!(record.require("a").is_err());
        assert!(record.require("b").is_err());
    }

    #[test]
    fn changed_fields_detects_single_difference() {
        let a = product("A", 10);
        let b = product("B", 10);
        assert_eq!(a.changed_fields(&b), vec!["name"]);
        assert!(a.changed_fields(&a.clone()).is_empty());
    }

    #[test]
    fn changed_fields_treats_missing_as_null() {
        let current = Record::new().with("note", Value::Null);
        assert!(current.changed_fields(&Record::new()).is_empty());

        let current = Record::new().with("note", "x");
        assert_eq!(current.changed_fields(&Record::new()), vec!["note"]);
    }

    #[test]
    fn project_keeps_declared_fields() {
        let fields = [
            FieldDef::new("id", FieldType::Integer),
            FieldDef::new("description", FieldType::Text).nullable(),
        ];
        let projected = product("A", 10).project(&fields);
        assert_eq!(projected.len(), 2);
        assert_eq!(projected.get("description"), Some(&Value::Null));
        assert!(!projected.contains("price"));
    }

    #[test]
    fn check_against_schema() {
        let fields = [
            FieldDef::new("id", FieldType::Integer),
            FieldDef::new("name", FieldType::Text),
            FieldDef::new("description", FieldType::Text).nullable(),
        ];
        assert!(product("A", 1).check_against(&fields).is_ok());

        let bad = Record::new().with("id", "one").with("name", "A");
        assert!(matches!(
            bad.check_against(&fields),
            Err(ModelError::FieldType { .. })
        ));

        let missing = Record::new().with("id", 1i32);
        assert_eq!(
            missing.check_against(&fields),
            Err(ModelError::missing_field("name"))
        );
    }

    proptest! {
        #[test]
        fn record_never_differs_from_itself(name in "[a-z]{0,12}", price in any::<i64>()) {
            let record = product(&name, price);
            prop_assert!(record.changed_fields(&record.clone()).is_empty());
        }
    }
}
