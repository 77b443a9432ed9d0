pub mod auth;
pub mod programs;
pub mod reservations;
pub mod seats;
pub mod speakers;
pub mod statistics;
pub mod tickets;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(auth::routes())
        .merge(speakers::routes())
        .merge(programs::routes())
        .merge(seats::routes())
        .merge(reservations::routes())
        .merge(tickets::routes())
        .merge(statistics::routes())
}
