//! Review handlers

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{ApiResult, AtLocation},
    middleware::AuthUser,
    models::SubmitReviewRequest,
    reviews,
    state::AppState,
};

/// Members the current user may still review on a trip
pub async fn review_targets(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let targets =
        reviews::pending_review_targets(state.repository.as_ref(), user.id, id, Utc::now())
            .await
            .at(format!("/dashboard/trips/{}", id))?;

    Ok(Json(targets))
}

pub async fn submit_review(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitReviewRequest>,
) -> ApiResult<impl IntoResponse> {
    let review = reviews::submit_review(
        state.repository.as_ref(),
        user.id,
        id,
        payload,
        Utc::now(),
    )
    .await
    .at(format!("/dashboard/trips/{}/review", id))?;

    Ok((StatusCode::CREATED, Json(review)))
}
