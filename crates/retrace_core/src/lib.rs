//! # Retrace Core
//!
//! Change interception, history synthesis and versioning for entities kept
//! in a relational store.
//!
//! Every save of a tracked entity passes through the same pipeline before
//! and around the store's commit:
//!
//! 1. [`collect_snapshots`] captures current and last-committed state
//! 2. [`has_changed`] drops writes that change no field
//! 3. [`HistorySynthesizer`] copies each changed entity into a history row
//! 4. the rows are appended to the entity's append-only history table
//!
//! [`VersionQuery`] numbers history rows per entity and
//! [`HistoryContext::restore`] writes a recorded version back through the
//! same pipeline.
//!
//! ## Configuration
//!
//! | Setting | Default | Alternative |
//! |---------|---------|-------------|
//! | [`CommitMode`] | `TwoPhase`: history committed after the entity | `Atomic`: one commit |
//! | [`TimestampPolicy`] | `EveryTransition` | `CreateOnly` |
//! | [`VersionStrategy`] | `Pushdown`: store sorts and pages | `Eager`: number in memory |
//!
//! ## Example
//!
//! ```rust
//! use chrono::{DateTime, Utc};
//! use retrace_core::{
//!     Config, Entity, HasHistory, HistoryContext, HistoryEntity, HistoryId, HistoryRegistry,
//!     CREATED_AT_FIELD, HISTORY_ID_FIELD,
//! };
//! use retrace_model::{FieldDef, FieldType, ModelResult, Record};
//! use retrace_store::InMemoryStore;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct City { id: i64, name: String }
//!
//! #[derive(Debug, Clone)]
//! struct CityHistory { history_id: HistoryId, created_at: Option<DateTime<Utc>>, id: i64, name: String }
//!
//! impl Entity for City {
//!     type Key = i64;
//!     const TABLE: &'static str = "cities";
//!     fn schema() -> &'static [FieldDef] {
//!         const F: &[FieldDef] = &[
//!             FieldDef::new("id", FieldType::Integer),
//!             FieldDef::new("name", FieldType::Text),
//!         ];
//!         F
//!     }
//!     fn key(&self) -> i64 { self.id }
//!     fn to_record(&self) -> Record {
//!         Record::new().with("id", self.id).with("name", self.name.as_str())
//!     }
//!     fn from_record(r: &Record) -> ModelResult<Self> {
//!         Ok(Self { id: r.get_as("id")?, name: r.get_as("name")? })
//!     }
//! }
//!
//! impl HasHistory for City {
//!     type History = CityHistory;
//! }
//!
//! impl HistoryEntity for CityHistory {
//!     type Base = City;
//!     const TABLE: &'static str = "cities_history";
//!     fn schema() -> &'static [FieldDef] {
//!         const F: &[FieldDef] = &[
//!             FieldDef::new(HISTORY_ID_FIELD, FieldType::Integer),
//!             FieldDef::new(CREATED_AT_FIELD, FieldType::Timestamp).nullable(),
//!             FieldDef::new("id", FieldType::Integer),
//!             FieldDef::new("name", FieldType::Text),
//!         ];
//!         F
//!     }
//!     fn history_id(&self) -> HistoryId { self.history_id }
//!     fn parent_key(&self) -> i64 { self.id }
//!     fn created_at(&self) -> Option<DateTime<Utc>> { self.created_at }
//!     fn from_base(b: &City, created_at: Option<DateTime<Utc>>) -> Self {
//!         Self { history_id: HistoryId::UNASSIGNED, created_at, id: b.id, name: b.name.clone() }
//!     }
//!     fn to_base(&self) -> City { City { id: self.id, name: self.name.clone() } }
//!     fn apply_to(&self, b: &mut City) { b.name = self.name.clone(); }
//!     fn to_record(&self) -> Record {
//!         Record::new()
//!             .with(HISTORY_ID_FIELD, self.history_id.as_u64() as i64)
//!             .with(CREATED_AT_FIELD, self.created_at)
//!             .with("id", self.id)
//!             .with("name", self.name.as_str())
//!     }
//!     fn from_record(r: &Record) -> ModelResult<Self> {
//!         Ok(Self {
//!             history_id: HistoryId::new(r.get_as(HISTORY_ID_FIELD)?),
//!             created_at: r.get_as(CREATED_AT_FIELD)?,
//!             id: r.get_as("id")?,
//!             name: r.get_as("name")?,
//!         })
//!     }
//! }
//!
//! let registry = HistoryRegistry::builder().register::<City>().build().unwrap();
//! let ctx = HistoryContext::new(InMemoryStore::new(), registry, Config::default()).unwrap();
//!
//! ctx.insert(&City { id: 1, name: "Bombay".into() }).unwrap();
//! ctx.update(&City { id: 1, name: "Mumbai".into() }).unwrap();
//! assert_eq!(ctx.list_versions::<City>(&1).unwrap().len(), 2);
//!
//! ctx.restore::<City>(&1, 1).unwrap();
//! assert_eq!(ctx.get::<City>(&1).unwrap().unwrap().name, "Bombay");
//! assert_eq!(ctx.list_versions::<City>(&1).unwrap().len(), 3);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cancel;
mod clock;
mod config;
mod context;
mod diff;
mod entity;
mod error;
mod registry;
mod restore;
mod snapshot;
mod synthesizer;
mod versions;

#[cfg(test)]
mod fixtures;

pub use cancel::CancellationToken;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CommitMode, Config, TimestampPolicy, VersionStrategy};
pub use context::{HistoryContext, SaveReport};
pub use diff::{changed_fields, has_changed};
pub use entity::{
    Entity, EntityKey, HasHistory, HistoryEntity, HistoryId, CREATED_AT_FIELD, HISTORY_ID_FIELD,
    RESERVED_HISTORY_FIELDS,
};
pub use error::{CoreError, CoreResult};
pub use registry::{validate_parity, EntityBinding, HistoryBinding, HistoryRegistry, RegistryBuilder};
pub use restore::{plan_restore, RestoreOutcome, RestoredEntity};
pub use snapshot::{collect_snapshots, ChangeSnapshot, TransitionKind};
pub use synthesizer::{HistoryBatch, HistoryRow, HistorySynthesizer};
pub use versions::{number, sort_versions, version_query, VersionQuery, VersionedEntity};
