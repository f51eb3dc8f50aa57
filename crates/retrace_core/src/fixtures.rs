//! Entity types shared by unit tests.

use crate::entity::{
    Entity, HasHistory, HistoryEntity, HistoryId, CREATED_AT_FIELD, HISTORY_ID_FIELD,
};
use chrono::{DateTime, Utc};
use retrace_model::{FieldDef, FieldType, ModelResult, Record};

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub body: Option<String>,
}

impl Note {
    pub fn new(id: i64, title: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            body: None,
        }
    }
}

impl Entity for Note {
    type Key = i64;
    const TABLE: &'static str = "notes";

    fn schema() -> &'static [FieldDef] {
        const FIELDS: &[FieldDef] = &[
            FieldDef::new("id", FieldType::Integer),
            FieldDef::new("title", FieldType::Text),
            FieldDef::new("body", FieldType::Text).nullable(),
        ];
        FIELDS
    }

    fn key(&self) -> i64 {
        self.id
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("title", self.title.as_str())
            .with("body", self.body.clone())
    }

    fn from_record(record: &Record) -> ModelResult<Self> {
        Ok(Self {
            id: record.get_as("id")?,
            title: record.get_as("title")?,
            body: record.get_as("body")?,
        })
    }
}

impl HasHistory for Note {
    type History = NoteHistory;
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteHistory {
    pub history_id: HistoryId,
    pub created_at: Option<DateTime<Utc>>,
    pub id: i64,
    pub title: String,
    pub body: Option<String>,
}

impl HistoryEntity for NoteHistory {
    type Base = Note;
    const TABLE: &'static str = "notes_history";

    fn schema() -> &'static [FieldDef] {
        const FIELDS: &[FieldDef] = &[
            FieldDef::new(HISTORY_ID_FIELD, FieldType::Integer),
            FieldDef::new(CREATED_AT_FIELD, FieldType::Timestamp).nullable(),
            FieldDef::new("id", FieldType::Integer),
            FieldDef::new("title", FieldType::Text),
            FieldDef::new("body", FieldType::Text).nullable(),
        ];
        FIELDS
    }

    fn history_id(&self) -> HistoryId {
        self.history_id
    }

    fn parent_key(&self) -> i64 {
        self.id
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn from_base(base: &Note, created_at: Option<DateTime<Utc>>) -> Self {
        Self {
            history_id: HistoryId::UNASSIGNED,
            created_at,
            id: base.id,
            title: base.title.clone(),
            body: base.body.clone(),
        }
    }

    fn to_base(&self) -> Note {
        Note {
            id: self.id,
            title: self.title.clone(),
            body: self.body.clone(),
        }
    }

    fn apply_to(&self, base: &mut Note) {
        base.title.clone_from(&self.title);
        base.body.clone_from(&self.body);
    }

    #[allow(clippy::cast_possible_wrap)]
    fn to_record(&self) -> Record {
        Record::new()
            .with(HISTORY_ID_FIELD, self.history_id.as_u64() as i64)
            .with(CREATED_AT_FIELD, self.created_at)
            .with("id", self.id)
            .with("title", self.title.as_str())
            .with("body", self.body.clone())
    }

    fn from_record(record: &Record) -> ModelResult<Self> {
        Ok(Self {
            history_id: HistoryId::new(record.get_as(HISTORY_ID_FIELD)?),
            created_at: record.get_as(CREATED_AT_FIELD)?,
            id: record.get_as("id")?,
            title: record.get_as("title")?,
            body: record.get_as("body")?,
        })
    }
}

/// An entity without history.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
}

impl Entity for Tag {
    type Key = String;
    const TABLE: &'static str = "tags";
    const KEY_FIELD: &'static str = "name";

    fn schema() -> &'static [FieldDef] {
        const FIELDS: &[FieldDef] = &[FieldDef::new("name", FieldType::Text)];
        FIELDS
    }

    fn key(&self) -> String {
        self.name.clone()
    }

    fn to_record(&self) -> Record {
        Record::new().with("name", self.name.as_str())
    }

    fn from_record(record: &Record) -> ModelResult<Self> {
        Ok(Self {
            name: record.get_as("name")?,
        })
    }
}
