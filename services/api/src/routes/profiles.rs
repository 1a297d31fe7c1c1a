//! Profile handlers

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{ApiResult, AtLocation},
    middleware::AuthUser,
    models::{Account, EnsureProfileRequest, UpdateProfileRequest},
    profiles,
    state::AppState,
};

/// Create or refresh the caller's profile after sign-in
pub async fn ensure_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Option<Json<EnsureProfileRequest>>,
) -> ApiResult<impl IntoResponse> {
    let request = payload.map(|Json(body)| body).unwrap_or_default();
    let profile = profiles::ensure_profile(state.repository.as_ref(), &user, request)
        .await
        .at("/dashboard")?;

    Ok(Json(Account::from(profile)))
}

/// Public profile page
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let profile = profiles::get_profile(state.repository.as_ref(), id, Utc::now())
        .await
        .at(format!("/dashboard/profile/{}", id))?;

    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let profile =
        profiles::update_profile(state.repository.as_ref(), user.id, payload, Utc::now())
            .await
            .at("/dashboard/profile")?;

    Ok(Json(profile))
}

pub async fn list_travel_styles(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let styles = profiles::list_travel_styles(state.repository.as_ref())
        .await
        .at("/dashboard/profile")?;

    Ok(Json(styles))
}
