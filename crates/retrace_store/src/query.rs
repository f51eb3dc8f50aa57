//! Query descriptions evaluated inside the store.

use retrace_model::{Record, Value};
use std::cmp::Ordering;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// An equality predicate on one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Field name.
    pub field: String,
    /// Required value.
    pub value: Value,
}

/// One ordering key.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// Field name.
    pub field: String,
    /// Direction.
    pub order: Order,
}

/// A filtered, ordered, paginated read.
///
/// ```
/// use retrace_model::Value;
/// use retrace_store::{Order, Query};
///
/// let query = Query::new()
///     .filter_eq("id", Value::Integer(1))
///     .order_by("created_at", Order::Asc)
///     .order_by("history_id", Order::Asc)
///     .offset(1)
///     .limit(1);
/// assert_eq!(query.filters.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Conjunction of equality filters.
    pub filters: Vec<Filter>,
    /// Ordering keys, most significant first.
    pub order: Vec<OrderBy>,
    /// Number of matching rows to skip.
    pub offset: usize,
    /// Maximum number of rows to return.
    pub limit: Option<usize>,
}

impl Query {
    /// Creates a query matching every row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality filter.
    #[must_use]
    pub fn filter_eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value,
        });
        self
    }

    /// Adds an ordering key.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, order: Order) -> Self {
        self.order.push(OrderBy {
            field: field.into(),
            order,
        });
        self
    }

    /// Sets the number of rows to skip.
    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Sets the maximum number of rows.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if the row satisfies every filter.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.filters
            .iter()
            .all(|f| record.get(&f.field).unwrap_or(&Value::Null) == &f.value)
    }

    /// Compares two rows by the ordering keys.
    #[must_use]
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        for key in &self.order {
            let left = a.get(&key.field).unwrap_or(&Value::Null);
            let right = b.get(&key.field).unwrap_or(&Value::Null);
            let ord = match key.order {
                Order::Asc => left.cmp(right),
                Order::Desc => right.cmp(left),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Evaluates the query over rows given in storage order.
    ///
    /// The sort is stable, so rows that tie on every ordering key keep their
    /// storage order.
    pub fn evaluate<'a, I>(&self, rows: I) -> Vec<Record>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut matched: Vec<&Record> = rows.into_iter().filter(|r| self.matches(r)).collect();
        if !self.order.is_empty() {
            matched.sort_by(|a, b| self.compare(a, b));
        }
        let limit = self.limit.unwrap_or(usize::MAX);
        matched
            .into_iter()
            .skip(self.offset)
            .take(limit)
            .cloned()
            .collect()
    }
}
