//! Test fixtures and context helpers.
//!
//! Provides a tracked `Product` entity, history types that fail schema
//! validation, and constructors for in-memory history contexts.

use chrono::{DateTime, Duration, TimeZone, Utc};
use retrace_core::{
    Config, Entity, HasHistory, HistoryContext, HistoryEntity, HistoryId, HistoryRegistry,
    ManualClock, CREATED_AT_FIELD, HISTORY_ID_FIELD,
};
use retrace_model::{FieldDef, FieldType, ModelResult, Record};
use retrace_store::InMemoryStore;
use std::sync::Arc;

/// A tracked product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Identity.
    pub id: i32,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Price in cents.
    pub price: i64,
}

impl Product {
    /// Creates a product without a description.
    pub fn new(id: i32, name: &str, price: i64) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: None,
            price,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

const PRODUCT_FIELDS: &[FieldDef] = &[
    FieldDef::new("id", FieldType::Integer),
    FieldDef::new("name", FieldType::Text),
    FieldDef::new("description", FieldType::Text).nullable(),
    FieldDef::new("price", FieldType::Integer),
];

impl Entity for Product {
    type Key = i32;
    const TABLE: &'static str = "products";

    fn schema() -> &'static [FieldDef] {
        PRODUCT_FIELDS
    }

    fn key(&self) -> i32 {
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
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductHistory {
    /// Store-assigned history identity.
    pub history_id: HistoryId,
    /// Snapshot time.
    pub created_at: Option<DateTime<Utc>>,
    /// Product identity.
    pub id: i32,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Price in cents.
    pub price: i64,
}

impl ProductHistory {
    /// The product fields of this snapshot.
    pub fn state(&self) -> Product {
        self.to_base()
    }
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

    fn parent_key(&self) -> i32 {
        self.id
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn from_base(base: &Product, created_at: Option<DateTime<Utc>>) -> Self {
        Self {
            history_id: HistoryId::UNASSIGNED,
            created_at,
            id: base.id,
            name: base.name.clone(),
            description: base.description.clone(),
            price: base.price,
        }
    }

    fn to_base(&self) -> Product {
        Product {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
        }
    }

    fn apply_to(&self, base: &mut Product) {
        base.name.clone_from(&self.name);
        base.description.clone_from(&self.description);
        base.price = self.price;
    }

    #[allow(clippy::cast_possible_wrap)]
    fn to_record(&self) -> Record {
        Record::new()
            .with(HISTORY_ID_FIELD, self.history_id.as_u64() as i64)
            .with(CREATED_AT_FIELD, self.created_at)
            .with("id", self.id)
            .with("name", self.name.as_str())
            .with("description", self.description.clone())
            .with("price", self.price)
    }

    fn from_record(record: &Record) -> ModelResult<Self> {
        Ok(Self {
            history_id: HistoryId::new(record.get_as(HISTORY_ID_FIELD)?),
            created_at: record.get_as(CREATED_AT_FIELD)?,
            id: record.get_as("id")?,
            name: record.get_as("name")?,
            description: record.get_as("description")?,
            price: record.get_as("price")?,
        })
    }
}

/// Declares a history type that reuses [`ProductHistory`] rows but a
/// different schema, for exercising the parity validator.
macro_rules! mismatched_history {
    ($(#[$meta:meta])* $name:ident, $base:ident, $table:literal, [$($field:expr),* $(,)?]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name(pub ProductHistory);

        /// Same fields as [`Product`], tracked by the mismatched history.
        #[derive(Debug, Clone, PartialEq)]
        pub struct $base(pub Product);

        impl Entity for $base {
            type Key = i32;
            const TABLE: &'static str = concat!($table, "_base");

            fn schema() -> &'static [FieldDef] {
                PRODUCT_FIELDS
            }

            fn key(&self) -> i32 {
                self.0.id
            }

            fn to_record(&self) -> Record {
                self.0.to_record()
            }

            fn from_record(record: &Record) -> ModelResult<Self> {
                Product::from_record(record).map(Self)
            }
        }

        impl HasHistory for $base {
            type History = $name;
        }

        impl HistoryEntity for $name {
            type Base = $base;
            const TABLE: &'static str = $table;

            fn schema() -> &'static [FieldDef] {
                const FIELDS: &[FieldDef] = &[$($field),*];
                FIELDS
            }

            fn history_id(&self) -> HistoryId {
                self.0.history_id
            }

            fn parent_key(&self) -> i32 {
                self.0.id
            }

            fn created_at(&self) -> Option<DateTime<Utc>> {
                self.0.created_at
            }

            fn from_base(base: &$base, created_at: Option<DateTime<Utc>>) -> Self {
                Self(ProductHistory::from_base(&base.0, created_at))
            }

            fn to_base(&self) -> $base {
                $base(self.0.to_base())
            }

            fn apply_to(&self, base: &mut $base) {
                self.0.apply_to(&mut base.0);
            }

            fn to_record(&self) -> Record {
                self.0.to_record()
            }

            fn from_record(record: &Record) -> ModelResult<Self> {
                ProductHistory::from_record(record).map(Self)
            }
        }
    };
}

mismatched_history!(
    /// History that forgot the `price` field.
    PricelessHistory,
    PricelessProduct,
    "priceless_history",
    [
        FieldDef::new(HISTORY_ID_FIELD, FieldType::Integer),
        FieldDef::new(CREATED_AT_FIELD, FieldType::Timestamp).nullable(),
        FieldDef::new("id", FieldType::Integer),
        FieldDef::new("name", FieldType::Text),
        FieldDef::new("description", FieldType::Text).nullable(),
    ]
);

mismatched_history!(
    /// History that declares `price` as text.
    TextPriceHistory,
    TextPriceProduct,
    "text_price_history",
    [
        FieldDef::new(HISTORY_ID_FIELD, FieldType::Integer),
        FieldDef::new(CREATED_AT_FIELD, FieldType::Timestamp).nullable(),
        FieldDef::new("id", FieldType::Integer),
        FieldDef::new("name", FieldType::Text),
        FieldDef::new("description", FieldType::Text).nullable(),
        FieldDef::new("price", FieldType::Text),
    ]
);

/// Start of every fixture clock.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("valid fixture date")
}

/// A clock that advances one second per reading.
pub fn ticking_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::ticking(epoch(), Duration::seconds(1)))
}

/// Registry with [`Product`] tracked.
pub fn product_registry() -> HistoryRegistry {
    HistoryRegistry::builder()
        .register::<Product>()
        .build()
        .expect("product registry is valid")
}

/// An in-memory context tracking [`Product`], with a ticking clock.
pub fn product_context(config: Config) -> HistoryContext<InMemoryStore> {
    HistoryContext::with_clock(
        InMemoryStore::new(),
        product_registry(),
        config,
        ticking_clock(),
    )
    .expect("in-memory context")
}

/// Runs a test against a fresh product context.
///
/// # Example
///
/// ```rust
/// use retrace_core::Config;
/// use retrace_testkit::{with_product_context, Product};
///
/// with_product_context(Config::default(), |ctx| {
///     ctx.insert(&Product::new(1, "A", 10)).unwrap();
///     assert_eq!(ctx.list_versions::<Product>(&1).unwrap().len(), 1);
/// });
/// ```
pub fn with_product_context<F, R>(config: Config, f: F) -> R
where
    F: FnOnce(&HistoryContext<InMemoryStore>) -> R,
{
    let ctx = product_context(config);
    f(&ctx)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// A product created, then renamed, then repriced.
    ///
    /// Leaves three recorded states: `A/10`, `B/10`, `B/12`.
    pub fn three_states(ctx: &HistoryContext<InMemoryStore>, id: i32) -> Vec<Product> {
        let states = vec![
            Product::new(id, "A", 10),
            Product::new(id, "B", 10),
            Product::new(id, "B", 12),
        ];
        ctx.insert(&states[0]).expect("insert");
        ctx.update(&states[1]).expect("update");
        ctx.update(&states[2]).expect("update");
        states
    }
}
