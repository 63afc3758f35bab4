use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use contracts::domain::user::aggregate::{AppUser, LoginRequest, SignupRequest};

use crate::state::AppState;

/// POST /api/signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<AppUser>, StatusCode> {
    match state.users.signup(request).await {
        Ok(user) => Ok(Json(user)),
        Err(e) => {
            tracing::warn!("Signup rejected: {}", e);
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

/// POST /api/login. Returns the account on a credential match; the response
/// never distinguishes a wrong password from an unknown email.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AppUser>, StatusCode> {
    match state.users.login(request).await {
        Ok(Some(user)) => Ok(Json(user)),
        Ok(None) => Err(StatusCode::UNAUTHORIZED),
        Err(e) => {
            tracing::error!("Login failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
