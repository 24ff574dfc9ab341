use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use hms_core::UserProfile;

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::services;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: &'static str,
    pub user: UserProfile,
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let (Some(username), Some(password)) = (
        request.username.filter(|u| !u.is_empty()),
        request.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::validation("Username and password are required"));
    };

    let user = services::auth::login(state.store.as_ref(), &username, &password, Utc::now()).await?;

    Ok(Json(LoginResponse {
        success: true,
        message: "Authentication successful",
        user,
    }))
}
