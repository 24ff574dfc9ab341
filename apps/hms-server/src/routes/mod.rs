//! # HTTP Routes
//!
//! ```text
//! GET  /api/health                    health::health
//! POST /api/auth/login                auth::login
//! GET  /api/dashboard                 reports::dashboard
//! GET  /api/user-dashboard            reports::user_dashboard
//! GET  /api/reports/sales             reports::sales
//! GET  /api/inventory                 inventory::list
//! GET  /api/inventory/low-stock       inventory::low_stock
//! GET  /api/inventory/{name}          inventory::get
//! POST /api/inventory/add             inventory::add
//! POST /api/inventory/restock         inventory::restock
//! POST /api/sales                     sales::create
//! GET  /api/services                  billing::services
//! GET  /api/billing                   billing::history
//! POST /api/billing                   billing::create
//! GET  /api/patients                  patients::list
//! POST /api/patients                  patients::register
//! GET  /api/patients/{id}             patients::get
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod billing;
pub mod health;
pub mod inventory;
pub mod patients;
pub mod reports;
pub mod sales;

/// All `/api` routes, without middleware.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/auth/login", post(auth::login))
        .route("/api/dashboard", get(reports::dashboard))
        .route("/api/user-dashboard", get(reports::user_dashboard))
        .route("/api/reports/sales", get(reports::sales))
        .route("/api/inventory", get(inventory::list))
        .route("/api/inventory/low-stock", get(inventory::low_stock))
        .route("/api/inventory/add", post(inventory::add))
        .route("/api/inventory/restock", post(inventory::restock))
        .route("/api/inventory/{name}", get(inventory::get))
        .route("/api/sales", post(sales::create))
        .route("/api/services", get(billing::services))
        .route("/api/billing", get(billing::history).post(billing::create))
        .route("/api/patients", get(patients::list).post(patients::register))
        .route("/api/patients/{id}", get(patients::get))
}
