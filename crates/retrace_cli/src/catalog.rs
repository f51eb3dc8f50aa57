//! The product catalog the CLI scripts operate on.

use chrono::{DateTime, Utc};
use retrace_core::{
    Entity, HasHistory, HistoryEntity, HistoryId, HistoryRegistry, CoreResult, CREATED_AT_FIELD,
    HISTORY_ID_FIELD,
};
use retrace_model::{FieldDef, FieldType, ModelResult, Record};
use serde::{Deserialize, Serialize};

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Identity.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Price in cents.
    pub price: i64,
}

impl Entity for Product {
    type Key = i64;
    const TABLE: &'static str = "products";

    fn schema() -> &'static [FieldDef] {
        const FIELDS: &[FieldDef] = &[
            FieldDef::new("id", FieldType::Integer),
            FieldDef::new("name", FieldType::Text),
            FieldDef::new("description", FieldType::Text).nullable(),
            FieldDef::new("price", FieldType::Integer),
        ];
        FIELDS
    }

    fn key(&self) -> i64 {
        self.id
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("name", self.name.as_str())
            .with("description", self.description.clone())
            .with("price", self.price)
    }

    fn from_record(record: &Record) -> ModelResult<Self> {
        Ok(Self {
            id: record.get_as("id")?,
            name: record.get_as("name")?,
            description: record.get_as("description")?,
            price: record.get_as("price")?,
        })
    }
}

impl HasHistory for Product {
    type History = ProductHistory;
}

/// One recorded state of a [`Product`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductHistory {
    /// Store-assigned history identity.
    #[serde(serialize_with = "serialize_history_id")]
    pub history_id: HistoryId,
    /// Snapshot time.
    pub created_at: Option<DateTime<Utc>>,
    /// The product as it was.
    #[serde(flatten)]
    pub state: Product,
}

fn serialize_history_id<S: serde::Serializer>(id: &HistoryId, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(id.as_u64())
}

impl HistoryEntity for ProductHistory {
    type Base = Product;
    const TABLE: &'static str = "products_history";

    fn schema() -> &'static [FieldDef] {
        const FIELDS: &[FieldDef] = &[
            FieldDef::new(HISTORY_ID_FIELD, FieldType::Integer),
            FieldDef::new(CREATED_AT_FIELD, FieldType::Timestamp).nullable(),
            FieldDef::new("id", FieldType::Integer),
            FieldDef::new("name", FieldType::Text),
            FieldDef::new("description", FieldType::Text).nullable(),
            FieldDef::new("price", FieldType::Integer),
        ];
        FIELDS
    }

    fn history_id(&self) -> HistoryId {
        self.history_id
    }

    fn parent_key(&self) -> i64 {
        self.state.id
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn from_base(base: &Product, created_at: Option<DateTime<Utc>>) -> Self {
        Self {
            history_id: HistoryId::UNASSIGNED,
            created_at,
            state: base.clone(),
        }
    }

    fn to_base(&self) -> Product {
        self.state.clone()
    }

    fn apply_to(&self, base: &mut Product) {
        base.name.clone_from(&self.state.name);
        base.description.clone_from(&self.state.description);
        base.price = self.state.price;
    }

    #[allow(clippy::cast_possible_wrap)]
    fn to_record(&self) -> Record {
        self.state
            .to_record()
            .with(HISTORY_ID_FIELD, self.history_id.as_u64() as i64)
            .with(CREATED_AT_FIELD, self.created_at)
    }

    fn from_record(record: &Record) -> ModelResult<Self> {
        Ok(Self {
            history_id: HistoryId::new(record.get_as(HISTORY_ID_FIELD)?),
            created_at: record.get_as(CREATED_AT_FIELD)?,
            state: Product::from_record(record)?,
        })
    }
}

/// Registry tracking the catalog.
pub fn registry() -> CoreResult<HistoryRegistry> {
    HistoryRegistry::builder().register::<Product>().build()
}
