//! Geocoding and photo proxy handlers

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::{
    error::{ApiResult, AtLocation},
    proxy::{GeocodeQuery, PhotoQuery},
    state::AppState,
};

pub async fn geocode(
    State(state): State<AppState>,
    Query(query): Query<GeocodeQuery>,
) -> ApiResult<impl IntoResponse> {
    let body = state
        .proxy
        .reverse_geocode(&query)
        .await
        .at("/dashboard/create-trip")?;

    Ok(Json(body))
}

pub async fn photos(
    State(state): State<AppState>,
    Query(query): Query<PhotoQuery>,
) -> ApiResult<impl IntoResponse> {
    let photos = state.proxy.search_photos(&query).await.at("/explore")?;

    Ok(Json(photos))
}
