use axum::Router;

use crate::state::AppState;

pub mod agent;
pub mod health;

/// All agent routes without transport middleware (rate limits, HTTPS).
pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(agent::router(state))
}
