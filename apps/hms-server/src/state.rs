//! Shared application state.

use std::sync::Arc;

use hms_core::ReportSettings;
use hms_db::Store;

/// State handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// The store selected at startup.
    pub store: Arc<dyn Store>,
    pub reports: ReportSettings,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, reports: ReportSettings) -> Self {
        AppState { store, reports }
    }
}
