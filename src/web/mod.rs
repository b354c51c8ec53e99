pub mod error;
pub mod forms;
pub mod reports;
pub mod submissions;
pub mod verify;

use crate::state::SharedState;
use axum::routing::get;
use axum::Router;

async fn health() -> &'static str {
    "ok"
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest(
            "/workspaces/:workspace_id",
            forms::router()
                .merge(submissions::router())
                .merge(reports::router()),
        )
        .merge(verify::router())
        .with_state(state)
}
