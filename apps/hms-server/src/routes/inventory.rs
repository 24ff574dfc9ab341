use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use hms_core::validation::{require_text, validate_quantity, validate_threshold};
use hms_core::{CoreError, InventoryItem, NewItem, ValidationError};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::services;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub message: &'static str,
    pub item: InventoryItem,
}

#[derive(Debug, Default, Deserialize)]
pub struct RestockRequest {
    pub name: Option<String>,
    pub quantity: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LowStockQuery {
    pub threshold: Option<i64>,
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<InventoryItem>>> {
    Ok(Json(state.store.list_items().await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<InventoryItem>> {
    let item = state
        .store
        .get_item(&name)
        .await?
        .ok_or(CoreError::ItemNotFound(name))?;
    Ok(Json(item))
}

pub async fn low_stock(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LowStockQuery>,
) -> ApiResult<Json<Vec<InventoryItem>>> {
    let threshold = query.threshold.unwrap_or(state.reports.low_stock_threshold);
    validate_threshold(threshold)?;
    Ok(Json(services::reports::low_stock(state.store.as_ref(), threshold).await?))
}

pub async fn add(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewItem>,
) -> ApiResult<(StatusCode, Json<ItemResponse>)> {
    let draft = request.validate()?;
    let item = state.store.add_item(draft, Utc::now()).await?;

    info!(item = %item.name, stock = item.stock, price = %item.price, "Added new item to inventory");

    Ok((
        StatusCode::CREATED,
        Json(ItemResponse {
            message: "Item added to inventory",
            item,
        }),
    ))
}

pub async fn restock(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RestockRequest>,
) -> ApiResult<Json<ItemResponse>> {
    let name = require_text("name", request.name.as_deref())?;
    let quantity = request
        .quantity
        .ok_or_else(|| ValidationError::required("quantity"))?;
    validate_quantity(quantity)?;

    let item = state.store.restock(&name, quantity, Utc::now()).await?;

    info!(item = %item.name, quantity, stock = item.stock, "Restocked item");

    Ok(Json(ItemResponse {
        message: "Item restocked successfully",
        item,
    }))
}
