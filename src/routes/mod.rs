use axum::Router;

use crate::state::AppState;

pub mod assignments;
pub mod doc;
pub mod health;
pub mod ledger;
pub mod orders;
pub mod params;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/orders", orders::router())
        .nest("/assignments", assignments::router())
        .nest("/ledger", ledger::router())
}
