use axum::routing::get;
use axum::Router;

mod index;

use crate::state::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/", get(index::handler))
        .with_state(state)
}
