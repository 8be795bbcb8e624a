pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::documents::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Documents API
        .route(
            "/documents/process",
            post(handlers::handle_process).get(handlers::handle_list),
        )
        .route("/documents/search", post(handlers::handle_search))
        .with_state(state)
}
