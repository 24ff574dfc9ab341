//! # Workflows
//!
//! Plain async functions over `&dyn Store`. Handlers parse the request,
//! call one of these, and shape the response; no HTTP types in here.

pub mod auth;
pub mod billing;
pub mod reports;
pub mod sales;
