//! # HMS Server
//!
//! HTTP/JSON API for the hospital management frontend.
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Client ──► TraceLayer ──► CorsLayer ──► TimeoutLayer ──► Router        │
//! │                                                            │            │
//! │                                    ┌───────────────────────┘            │
//! │                                    ▼                                    │
//! │                       routes/* (extract, shape JSON)                    │
//! │                                    │                                    │
//! │                                    ▼                                    │
//! │                       services/* (multi-step workflows)                 │
//! │                                    │                                    │
//! │                                    ▼                                    │
//! │                       Arc<dyn Store> (SQLite or memory)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `main.rs` owns process concerns (config, store selection, ports,
//! shutdown). Everything here is constructible in tests without a socket.

use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::AppState;

/// Builds the full application: routes plus middleware.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    routes::api_routes()
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
