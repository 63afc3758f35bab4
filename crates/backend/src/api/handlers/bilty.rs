use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use contracts::domain::bilty::aggregate::{Bilty, RenderedDocument};
use serde_json::json;

use crate::domain::bilty::store::BiltyFilter;
use crate::error::StoreError;
use crate::state::AppState;

fn status_for(err: &StoreError) -> StatusCode {
    match err {
        StoreError::Validation(_) | StoreError::UnknownFilter(_) => StatusCode::BAD_REQUEST,
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Db(_) | StoreError::Encode(_) => {
            tracing::error!("bilty storage error: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// POST /api/bilty. Creates when the payload has no id, updates otherwise.
pub async fn create_or_update(
    State(state): State<Arc<AppState>>,
    Json(note): Json<Bilty>,
) -> Result<Json<Bilty>, StatusCode> {
    match state.bilty.create_or_update(note).await {
        Ok(saved) => Ok(Json(saved)),
        Err(e) => Err(status_for(&e)),
    }
}

/// GET /api/bilty. Every query parameter becomes an exact-match filter.
/// Numeric-looking values are compared as numbers, the rest as text.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Vec<Bilty>>, StatusCode> {
    let mut filter = BiltyFilter::new();
    for (key, value) in params {
        if value.is_empty() {
            continue;
        }
        match value.parse::<i64>() {
            Ok(number) => filter.insert(key, number),
            Err(_) => filter.insert(key, value),
        }
    }
    match state.bilty.fetch(&filter, false).await {
        Ok(list) => Ok(Json(list)),
        Err(e) => Err(status_for(&e)),
    }
}

/// GET /api/bilty/:id
pub async fn get_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Bilty>, StatusCode> {
    match state.bilty.fetch_by_id(id).await {
        Ok(Some(note)) => Ok(Json(note)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => Err(status_for(&e)),
    }
}

/// DELETE /api/bilty/:id. Succeeds even when the id is already gone.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    match state.bilty.delete(id).await {
        Ok(()) => Ok(Json(json!({"deleted": id}))),
        Err(e) => Err(status_for(&e)),
    }
}

/// POST /api/bilty/:id/document. The rendering collaborator reports a
/// finished document here.
pub async fn record_rendered(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(info): Json<RenderedDocument>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    match state
        .bilty
        .record_rendered_document(id, &info.path, info.rendered_at)
        .await
    {
        Ok(()) => Ok(Json(json!({"id": id, "path": info.path}))),
        Err(e) => Err(status_for(&e)),
    }
}
