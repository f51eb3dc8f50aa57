//! Registration table and schema parity validation.
//!
//! The registry is built once at startup. [`RegistryBuilder::build`] checks
//! every (base, history) pair and either returns an immutable
//! [`HistoryRegistry`] or the first mismatch it finds; nothing is partially
//! registered.

use crate::entity::{
    Entity, EntityKey, HasHistory, HistoryEntity, HISTORY_ID_FIELD, RESERVED_HISTORY_FIELDS,
};
use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use retrace_model::{find_field, FieldDef, FieldType, ModelResult, Record};
use retrace_store::TableSpec;
use std::any::type_name;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::info;

type SynthesizeFn = fn(&Record, Option<DateTime<Utc>>) -> ModelResult<Record>;

/// History half of a registration.
///
/// Holds the history type's copy routine, monomorphized at registration.
#[derive(Clone, Copy)]
pub struct HistoryBinding {
    /// History table.
    pub table: &'static str,
    /// History type name.
    pub type_name: &'static str,
    schema: fn() -> &'static [FieldDef],
    synthesize: SynthesizeFn,
}

impl HistoryBinding {
    fn of<T: HasHistory>() -> Self {
        Self {
            table: <T::History as HistoryEntity>::TABLE,
            type_name: type_name::<T::History>(),
            schema: <T::History as HistoryEntity>::schema,
            synthesize: synthesize_row::<T>,
        }
    }

    /// Declared history fields.
    #[must_use]
    pub fn schema(&self) -> &'static [FieldDef] {
        (self.schema)()
    }

    /// Builds an unstored history row from a base row.
    ///
    /// The returned record has no `history_id`; the store assigns it.
    pub fn synthesize(
        &self,
        base: &Record,
        created_at: Option<DateTime<Utc>>,
    ) -> ModelResult<Record> {
        (self.synthesize)(base, created_at)
    }

    /// Table definition for the history table.
    #[must_use]
    pub fn table_spec(&self) -> TableSpec {
        TableSpec::append_only(self.table, HISTORY_ID_FIELD)
    }
}

impl fmt::Debug for HistoryBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryBinding")
            .field("table", &self.table)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

fn synthesize_row<T: HasHistory>(
    base: &Record,
    created_at: Option<DateTime<Utc>>,
) -> ModelResult<Record> {
    let entity = T::from_record(base)?;
    let mut record = T::History::from_base(&entity, created_at).to_record();
    record.remove(HISTORY_ID_FIELD);
    Ok(record)
}

/// One registered entity type.
#[derive(Debug, Clone, Copy)]
pub struct EntityBinding {
    /// Live table.
    pub table: &'static str,
    /// Key field of the live table.
    pub key_field: &'static str,
    /// Semantic type of the key.
    pub key_type: FieldType,
    /// Entity type name.
    pub type_name: &'static str,
    schema: fn() -> &'static [FieldDef],
    history: Option<HistoryBinding>,
}

impl EntityBinding {
    fn of<T: Entity>(history: Option<HistoryBinding>) -> Self {
        Self {
            table: T::TABLE,
            key_field: T::KEY_FIELD,
            key_type: <T::Key as EntityKey>::FIELD_TYPE,
            type_name: type_name::<T>(),
            schema: T::schema,
            history,
        }
    }

    /// Declared base fields.
    #[must_use]
    pub fn schema(&self) -> &'static [FieldDef] {
        (self.schema)()
    }

    /// History binding, if the type has history.
    #[must_use]
    pub fn history(&self) -> Option<&HistoryBinding> {
        self.history.as_ref()
    }

    /// Returns true if the type has history.
    #[must_use]
    pub fn is_tracked(&self) -> bool {
        self.history.is_some()
    }

    /// Table definition for the live table.
    #[must_use]
    pub fn table_spec(&self) -> TableSpec {
        TableSpec::keyed(self.table, self.key_field)
    }
}

/// Builder for [`HistoryRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<EntityBinding>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity type with history.
    #[must_use]
    pub fn register<T: HasHistory>(mut self) -> Self {
        self.entries
            .push(EntityBinding::of::<T>(Some(HistoryBinding::of::<T>())));
        self
    }

    /// Registers an entity type without history.
    ///
    /// Saves of such entities are committed but never produce history.
    #[must_use]
    pub fn register_untracked<T: Entity>(mut self) -> Self {
        self.entries.push(EntityBinding::of::<T>(None));
        self
    }

    /// Validates every registration and freezes the registry.
    ///
    /// # Errors
    ///
    /// - `DuplicateRegistration` if two registrations share a table name
    /// - `SchemaMismatch` if a history type does not contain its base type
    pub fn build(self) -> CoreResult<HistoryRegistry> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            let history_table = entry.history.map(|h| h.table);
            for table in std::iter::once(entry.table).chain(history_table) {
                if !seen.insert(table) {
                    return Err(CoreError::DuplicateRegistration {
                        table: table.to_string(),
                    });
                }
            }
            check_key(entry)?;
            if let Some(history) = &entry.history {
                validate_parity(
                    entry.type_name,
                    entry.schema(),
                    history.type_name,
                    history.schema(),
                )?;
            }
        }

        let entries: BTreeMap<_, _> = self.entries.into_iter().map(|e| (e.table, e)).collect();
        let tracked = entries.values().filter(|e| e.is_tracked()).count();
        info!(
            entities = entries.len(),
            tracked, "history registry validated"
        );
        Ok(HistoryRegistry { entries })
    }
}

fn check_key(entry: &EntityBinding) -> CoreResult<()> {
    let expected = FieldDef::new(entry.key_field, entry.key_type);
    match find_field(entry.schema(), entry.key_field) {
        Some(field) if field.same_type_as(&expected) => Ok(()),
        Some(field) => Err(CoreError::schema_mismatch(
            entry.type_name,
            entry.history.map_or("-", |h| h.type_name),
            entry.key_field,
            format!("is the key but is declared as `{field}`, expected `{expected}`"),
        )),
        None => Err(CoreError::schema_mismatch(
            entry.type_name,
            entry.history.map_or("-", |h| h.type_name),
            entry.key_field,
            "is the key but is not declared",
        )),
    }
}

/// Checks that a history schema structurally contains a base schema.
///
/// Every base field must appear in the history schema with the same name and
/// the same semantic type. The history schema must also declare the reserved
/// history fields, which the base schema may not use.
///
/// # Errors
///
/// Returns `SchemaMismatch` naming the first offending field.
pub fn validate_parity(
    base_name: &'static str,
    base: &[FieldDef],
    history_name: &'static str,
    history: &[FieldDef],
) -> CoreResult<()> {
    let mismatch =
        |field: &str, reason: String| CoreError::schema_mismatch(base_name, history_name, field, reason);

    for (i, field) in base.iter().enumerate() {
        if base[..i].iter().any(|f| f.name == field.name) {
            return Err(mismatch(field.name, "is declared twice in the base type".into()));
        }
        if find_field(RESERVED_HISTORY_FIELDS, field.name).is_some() {
            return Err(mismatch(field.name, "is reserved for history rows".into()));
        }
        match find_field(history, field.name) {
            None => return Err(mismatch(field.name, "is missing from history".into())),
            Some(found) if !found.same_type_as(field) => {
                return Err(mismatch(
                    field.name,
                    format!("is `{found}` in history, expected `{field}`"),
                ));
            }
            Some(_) => {}
        }
    }

    for reserved in RESERVED_HISTORY_FIELDS {
        match find_field(history, reserved.name) {
            None => return Err(mismatch(reserved.name, "is missing from history".into())),
            Some(found) if !found.same_type_as(reserved) => {
                return Err(mismatch(
                    reserved.name,
                    format!("is `{found}` in history, expected `{reserved}`"),
                ));
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// Immutable, validated registration table.
#[derive(Debug, Clone)]
pub struct HistoryRegistry {
    entries: BTreeMap<&'static str, EntityBinding>,
}

impl HistoryRegistry {
    /// Starts building a registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Looks up the registration for a live table.
    #[must_use]
    pub fn binding(&self, table: &str) -> Option<&EntityBinding> {
        self.entries.get(table)
    }

    /// Looks up the history binding for a live table.
    #[must_use]
    pub fn history_binding(&self, table: &str) -> Option<&HistoryBinding> {
        self.binding(table).and_then(EntityBinding::history)
    }

    /// Returns the registration of `T`.
    pub fn require<T: Entity>(&self) -> CoreResult<&EntityBinding> {
        self.binding(T::TABLE).ok_or(CoreError::NotTracked {
            type_name: type_name::<T>(),
        })
    }

    /// Returns the history binding of `T`.
    pub fn require_history<T: HasHistory>(&self) -> CoreResult<&HistoryBinding> {
        self.history_binding(T::TABLE).ok_or(CoreError::NotTracked {
            type_name: type_name::<T>(),
        })
    }

    /// Iterates registrations ordered by table name.
    pub fn bindings(&self) -> impl Iterator<Item = &EntityBinding> {
        self.entries.values()
    }

    /// Definitions of every live and history table.
    #[must_use]
    pub fn table_specs(&self) -> Vec<TableSpec> {
        let mut specs = Vec::new();
        for entry in self.entries.values() {
            specs.push(entry.table_spec());
            if let Some(history) = &entry.history {
                specs.push(history.table_spec());
            }
        }
        specs
    }

    /// Returns the number of registered entity types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
