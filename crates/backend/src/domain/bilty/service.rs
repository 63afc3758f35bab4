use std::sync::Arc;

use chrono::{DateTime, Utc};
use contracts::domain::bilty::aggregate::Bilty;

use super::store::{BiltyFilter, BiltyStore};
use crate::error::StoreResult;

/// Thin façade the HTTP edge talks to. All behavior lives in the store
/// implementation selected at startup.
#[derive(Clone)]
pub struct BiltyService {
    store: Arc<dyn BiltyStore>,
}

impl BiltyService {
    pub fn new(store: Arc<dyn BiltyStore>) -> Self {
        Self { store }
    }

    pub async fn create_or_update(&self, note: Bilty) -> StoreResult<Bilty> {
        self.store.create_or_update(note).await
    }

    pub async fn fetch(&self, filter: &BiltyFilter, single: bool) -> StoreResult<Vec<Bilty>> {
        self.store.fetch(filter, single).await
    }

    pub async fn fetch_by_id(&self, id: i64) -> StoreResult<Option<Bilty>> {
        self.store.fetch_by_id(id).await
    }

    pub async fn record_rendered_document(
        &self,
        id: i64,
        path: &str,
        rendered_at: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        self.store
            .update_rendered_document(id, path, rendered_at.unwrap_or_else(Utc::now))
            .await
    }

    pub async fn delete(&self, id: i64) -> StoreResult<()> {
        self.store.delete(id).await
    }
}
