use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use hms_core::{CoreError, NewPatient, PatientQuery, PatientRecord};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PatientResponse {
    pub message: &'static str,
    pub patient: PatientRecord,
}

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PatientQuery>,
) -> ApiResult<Json<Vec<PatientRecord>>> {
    Ok(Json(state.store.list_patients(&query).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PatientRecord>> {
    let patient = state
        .store
        .get_patient(&id)
        .await?
        .ok_or(CoreError::PatientNotFound(id))?;
    Ok(Json(patient))
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<NewPatient>,
) -> ApiResult<(StatusCode, Json<PatientResponse>)> {
    let registration = form.validate()?;
    let patient = state.store.register_patient(registration, Utc::now()).await?;

    info!(id = %patient.id, "Patient registered");

    Ok((
        StatusCode::CREATED,
        Json(PatientResponse {
            message: "Patient registered successfully",
            patient,
        }),
    ))
}
