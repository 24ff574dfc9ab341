use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use hms_core::{InventoryItem, LedgerEntry};

use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::services::sales::process_sale;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub product_name: Option<String>,
    pub quantity: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SaleResponse {
    pub message: &'static str,
    pub inventory: Vec<InventoryItem>,
    pub sale: LedgerEntry,
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SaleRequest>,
) -> ApiResult<Json<SaleResponse>> {
    let outcome = process_sale(
        state.store.as_ref(),
        request.product_name.as_deref(),
        request.quantity,
        Utc::now(),
    )
    .await?;

    Ok(Json(SaleResponse {
        message: "Sale processed successfully",
        inventory: outcome.inventory,
        sale: outcome.sale,
    }))
}
