/// API routes and handlers
pub mod events;
pub mod health;
pub mod recovery;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(events::routes())
        .merge(recovery::routes())
}
