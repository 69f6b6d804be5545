pub mod health;
pub mod insights;
pub mod reports;
pub mod timing;

use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest(
            "/api/properties/{property_id}",
            Router::new()
                .merge(reports::router())
                .merge(timing::router())
                .merge(insights::router()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
