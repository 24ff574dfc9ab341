use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use hms_core::billing::{MedicalService, SERVICE_CATALOG};
use hms_core::{LedgerEntry, LedgerFilter, PatientRecord};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::services::billing::{generate_bill, BillRequest};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BillResponse {
    pub message: &'static str,
    pub bill: LedgerEntry,
    pub patient: PatientRecord,
}

/// The billable service price list.
pub async fn services() -> Json<&'static [MedicalService]> {
    Json(SERVICE_CATALOG)
}

/// Ledger history, oldest first.
pub async fn history(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<LedgerFilter>,
) -> ApiResult<Json<Vec<LedgerEntry>>> {
    Ok(Json(state.store.query_ledger(&filter).await?))
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BillRequest>,
) -> ApiResult<(StatusCode, Json<BillResponse>)> {
    let outcome = generate_bill(state.store.as_ref(), request, Utc::now()).await?;

    Ok((
        StatusCode::CREATED,
        Json(BillResponse {
            message: "Bill generated successfully",
            bill: outcome.bill,
            patient: outcome.patient,
        }),
    ))
}
