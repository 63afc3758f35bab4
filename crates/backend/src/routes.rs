use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::api::handlers;
use crate::state::AppState;

/// All application routes.
pub fn configure_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        // Accounts
        .route("/api/signup", post(handlers::users::signup))
        .route("/api/login", post(handlers::users::login))
        // Consignment notes
        .route(
            "/api/bilty",
            post(handlers::bilty::create_or_update).get(handlers::bilty::list),
        )
        .route(
            "/api/bilty/:id",
            get(handlers::bilty::get_by_id).delete(handlers::bilty::delete),
        )
        .route(
            "/api/bilty/:id/document",
            post(handlers::bilty::record_rendered),
        )
        // Company profile
        .route(
            "/api/initial",
            get(handlers::initial_setup::get_latest).post(handlers::initial_setup::save),
        )
        .with_state(state)
}
