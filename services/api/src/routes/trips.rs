//! Trip, join request and dashboard handlers

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::{ApiResult, AtLocation},
    middleware::AuthUser,
    models::{CreateTripRequest, ResolveRequest, TripSearchQuery},
    state::AppState,
    trips,
};

fn trip_page(id: Uuid) -> String {
    format!("/dashboard/trips/{}", id)
}

/// Search upcoming trips
pub async fn search_trips(
    State(state): State<AppState>,
    Query(query): Query<TripSearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let today = Utc::now().date_naive();
    let trips = trips::search_trips(state.repository.as_ref(), &query, today)
        .await
        .at("/trips")?;

    Ok(Json(trips))
}

/// Upcoming trips grouped by destination
pub async fn explore(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let today = Utc::now().date_naive();
    let destinations = trips::explore_destinations(state.repository.as_ref(), today)
        .await
        .at("/explore")?;

    Ok(Json(destinations))
}

pub async fn create_trip(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateTripRequest>,
) -> ApiResult<impl IntoResponse> {
    let trip = trips::create_trip(state.repository.as_ref(), user.id, payload)
        .await
        .at("/dashboard/create-trip")?;

    Ok((StatusCode::CREATED, Json(trip)))
}

/// Trip page for the current user
pub async fn get_trip(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let details = trips::trip_details(state.repository.as_ref(), user.id, id, Utc::now())
        .await
        .at("/dashboard")?;

    Ok(Json(details))
}

pub async fn request_to_join(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let participant = trips::request_to_join(state.repository.as_ref(), user.id, id)
        .await
        .at(trip_page(id))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Join request sent successfully",
            "participant": participant,
        })),
    ))
}

/// Approve or decline a join request
pub async fn resolve_join_request(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((id, participant_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ResolveRequest>,
) -> ApiResult<impl IntoResponse> {
    let resolved = trips::resolve_join_request(
        state.repository.as_ref(),
        user.id,
        id,
        Some(participant_id),
        payload.action.as_deref(),
    )
    .await
    .at(trip_page(id))?;

    let verb = resolved.participant.status.as_str();
    Ok(Json(json!({
        "message": format!("Request {} successfully", verb),
        "participant": resolved.participant,
        "chat_room": resolved.chat_room,
    })))
}

pub async fn hosted_trips(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let trips = trips::hosted_trips(state.repository.as_ref(), user.id)
        .await
        .at("/dashboard/my-trips")?;

    Ok(Json(trips))
}

pub async fn joined_trips(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let trips = trips::joined_trips(state.repository.as_ref(), user.id)
        .await
        .at("/dashboard/my-trips")?;

    Ok(Json(trips))
}
