use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use contracts::domain::initial_setup::aggregate::InitialSetup;

use crate::state::AppState;

/// GET /api/initial. Returns the latest saved company profile.
pub async fn get_latest(
    State(state): State<Arc<AppState>>,
) -> Result<Json<InitialSetup>, StatusCode> {
    match state.initial_setup.get_latest().await {
        Ok(Some(profile)) => Ok(Json(profile)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to load initial setup: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// POST /api/initial
pub async fn save(
    State(state): State<Arc<AppState>>,
    Json(profile): Json<InitialSetup>,
) -> Result<Json<InitialSetup>, StatusCode> {
    match state.initial_setup.save(profile).await {
        Ok(saved) => Ok(Json(saved)),
        Err(e) => {
            tracing::warn!("Rejected initial setup payload: {}", e);
            Err(StatusCode::BAD_REQUEST)
        }
    }
}
