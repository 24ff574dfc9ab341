use axum::extract::State;
use axum::Json;
use chrono::Utc;

use hms_core::reports::{AdminDashboard, SalesReport, UserDashboard};

use crate::error::ApiResult;
use crate::services::reports;
use crate::state::AppState;

pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<AdminDashboard>> {
    let dashboard = reports::admin_dashboard(state.store.as_ref(), &state.reports, Utc::now()).await?;
    Ok(Json(dashboard))
}

pub async fn user_dashboard(State(state): State<AppState>) -> ApiResult<Json<UserDashboard>> {
    Ok(Json(reports::user_dashboard(state.store.as_ref(), &state.reports).await?))
}

pub async fn sales(State(state): State<AppState>) -> ApiResult<Json<SalesReport>> {
    Ok(Json(reports::sales_report(state.store.as_ref()).await?))
}
