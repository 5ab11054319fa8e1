//! HTTP layer: Axum router, cookie sessions, handlers and HTML views.
//!
//! Routes: `/`, `/signup`, `/login`, `/logout`, `/create_credit_card`,
//! `/view_credit_card/{card_id}` and a `/health` probe.

mod error;
mod flash;
mod handlers;
mod session;
mod state;
mod views;


pub use handlers::router;
pub use state::AppState;
