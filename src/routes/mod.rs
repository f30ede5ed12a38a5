use axum::Router;

use crate::MeasurementStore;

mod health;
mod ingest;

// ---

/// Build the full API router with `store` as shared state.
pub fn router<S: MeasurementStore>(store: S) -> Router {
    // ---
    Router::new()
        .merge(ingest::router::<S>())
        .merge(health::router::<S>())
        .with_state(store)
}
