pub mod error;
pub mod routes;

pub use error::*;
pub use routes::*;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Full application router: routes, shared state, CORS for any origin and
/// request tracing.
pub fn build_router(state: AppState) -> Router {
    create_routes()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
