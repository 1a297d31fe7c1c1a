//! API service routes

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;

use crate::{middleware::auth_middleware, state::AppState};

pub mod chat;
pub mod profiles;
pub mod proxy;
pub mod reviews;
pub mod trips;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/trips", post(trips::create_trip))
        .route("/trips/:id", get(trips::get_trip))
        .route("/trips/:id/join", post(trips::request_to_join))
        .route(
            "/trips/:id/requests/:participant_id",
            post(trips::resolve_join_request),
        )
        .route("/trips/:id/chat", get(chat::get_trip_chat_room))
        .route(
            "/chat/:room_id/messages",
            get(chat::list_messages).post(chat::send_message),
        )
        .route("/trips/:id/reviews/targets", get(reviews::review_targets))
        .route("/trips/:id/reviews", post(reviews::submit_review))
        .route("/dashboard/hosted", get(trips::hosted_trips))
        .route("/dashboard/joined", get(trips::joined_trips))
        .route("/me", post(profiles::ensure_profile))
        .route("/me/profile", put(profiles::update_profile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/trips", get(trips::search_trips))
        .route("/explore", get(trips::explore))
        .route("/users/:id", get(profiles::get_profile))
        .route("/travel-styles", get(profiles::list_travel_styles))
        .route("/api/geocode", get(proxy::geocode))
        .route("/api/photos", get(proxy::photos))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
///
/// Reports 503 when the database is unreachable. Redis is optional and only
/// reported.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = state.repository.ping().await;
    let cache = match &state.cache {
        Some(cache) => match cache.health_check().await {
            Ok(true) => "ok",
            _ => "unavailable",
        },
        None => "disabled",
    };

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if database { "ok" } else { "degraded" },
            "service": "roam-api",
            "database": if database { "ok" } else { "unavailable" },
            "cache": cache,
        })),
    )
}
