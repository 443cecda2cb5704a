//! HTTP surface.
//!
//! | Method | Path                     | Role          |
//! |--------|--------------------------|---------------|
//! | GET    | `/health`                | none          |
//! | POST   | `/auth/login`            | none          |
//! | POST   | `/auth/verify`           | none          |
//! | POST   | `/auth/logout`           | any           |
//! | GET    | `/proposals`             | any           |
//! | POST   | `/proposals`             | `TREASURY`    |
//! | POST   | `/proposals/:id/sign`    | `VERIFIER`    |
//! | POST   | `/proposals/:id/release` | `TREASURY`    |
//! | GET    | `/balances`              | any           |

pub mod error;
pub mod extract;
pub mod handlers;

use crate::ledger::LedgerClient;
use crate::service::EscrowService;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared handler state.
pub type AppState<L> = Arc<EscrowService<L>>;

/// Build the API router over `service`.
pub fn router<L: LedgerClient + 'static>(service: AppState<L>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::<L>))
        .route("/auth/login", post(handlers::login::<L>))
        .route("/auth/verify", post(handlers::verify::<L>))
        .route("/auth/logout", post(handlers::logout::<L>))
        .route(
            "/proposals",
            get(handlers::list_proposals::<L>).post(handlers::create_proposal::<L>),
        )
        .route("/proposals/:id/sign", post(handlers::sign::<L>))
        .route("/proposals/:id/release", post(handlers::release::<L>))
        .route("/balances", get(handlers::balances::<L>))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
