use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contracts::domain::bilty::aggregate::Bilty;

use crate::error::StoreResult;

/// Fields callers may filter consignment notes by. Each backend maps these to
/// its own parameterized query fragment; anything outside the set is rejected
/// and never reaches a query string.
pub const FILTERABLE_FIELDS: &[&str] = &[
    "id",
    "bilty_no",
    "status",
    "created_by",
    "from_location",
    "to_location",
    "consignor_company_id",
    "consignee_company_id",
];

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i64),
    Text(String),
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<FilterValue> for sea_orm::Value {
    fn from(value: FilterValue) -> Self {
        match value {
            FilterValue::Int(i) => i.into(),
            FilterValue::Text(s) => s.into(),
        }
    }
}

/// Exact-match filter set keyed by field name. Validation against
/// [`FILTERABLE_FIELDS`] happens inside the store executing the query.
#[derive(Debug, Clone, Default)]
pub struct BiltyFilter {
    entries: BTreeMap<String, FilterValue>,
}

impl BiltyFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: i64) -> Self {
        Self::new().with("id", id)
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FilterValue>) {
        self.entries.insert(field.into(), value.into());
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// The consignment-note persistence engine. One implementation is selected at
/// startup from configuration and injected wherever notes are read or
/// written; business code never branches on the backend.
#[async_trait]
pub trait BiltyStore: Send + Sync {
    /// Create (id unset) or update (id set) a note atomically, resolving
    /// nested company/address/user payloads into references. Returns the note
    /// with storage-assigned id, number and timestamps.
    async fn create_or_update(&self, note: Bilty) -> StoreResult<Bilty>;

    /// Exact-match query. `single` limits the result to the most recent
    /// match; multi results come newest-first. No match is an empty list,
    /// not an error.
    async fn fetch(&self, filter: &BiltyFilter, single: bool) -> StoreResult<Vec<Bilty>>;

    async fn fetch_by_id(&self, id: i64) -> StoreResult<Option<Bilty>> {
        Ok(self
            .fetch(&BiltyFilter::by_id(id), true)
            .await?
            .into_iter()
            .next())
    }

    /// Record where and when a document was rendered for the note.
    async fn update_rendered_document(
        &self,
        id: i64,
        path: &str,
        rendered_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Remove a note, its goods, and any reference rows that become
    /// unreferenced. Deleting an unknown id succeeds.
    async fn delete(&self, id: i64) -> StoreResult<()>;
}
