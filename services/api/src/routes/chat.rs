//! Chat handlers

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    chat,
    error::{ApiResult, AtLocation},
    middleware::AuthUser,
    models::SendMessageRequest,
    state::AppState,
};

fn chat_page(room_id: Uuid) -> String {
    format!("/dashboard/chat/{}", room_id)
}

/// Room of a trip, `null` until the first participant is approved
pub async fn get_trip_chat_room(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let room = chat::chat_room_for_trip(state.repository.as_ref(), user.id, id)
        .await
        .at(format!("/dashboard/trips/{}", id))?;

    Ok(Json(json!({ "chat_room": room })))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(room_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let messages = chat::list_messages(state.repository.as_ref(), user.id, room_id)
        .await
        .at("/dashboard/chat")?;

    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(room_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let message = chat::send_message(
        state.repository.as_ref(),
        user.id,
        room_id,
        payload.content.as_deref(),
    )
    .await
    .at(chat_page(room_id))?;

    Ok((StatusCode::CREATED, Json(message)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::Repository;
    use crate::repositories::memory::MemoryRepository;
    use crate::testing::{seed_approved, seed_trip};
    use std::sync::Arc;

    fn as_user(id: Uuid) -> Extension<AuthUser> {
        Extension(AuthUser {
            id,
            email: None,
            full_name: None,
        })
    }

    #[tokio::test]
    async fn outsiders_cannot_post() {
        let repo = Arc::new(MemoryRepository::default());
        let state = AppState::for_tests(repo.clone());
        let host = repo.seed_user("Hana").await;
        let outsider = repo.seed_user("Omar").await;
        let trip = seed_trip(repo.as_ref(), host.id).await;
        let room = repo
            .create_chat_room_if_absent(trip.id)
            .await
            .unwrap()
            .unwrap();

        let result = send_message(
            State(state.clone()),
            as_user(outsider.id),
            Path(room.id),
            Json(SendMessageRequest {
                content: Some("hello".to_string()),
            }),
        )
        .await;
        assert_eq!(result.err().unwrap().status(), StatusCode::FORBIDDEN);

        let result = send_message(
            State(state),
            as_user(host.id),
            Path(room.id),
            Json(SendMessageRequest { content: None }),
        )
        .await;
        assert_eq!(result.err().unwrap().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn members_exchange_messages() {
        let repo = Arc::new(MemoryRepository::default());
        let state = AppState::for_tests(repo.clone());
        let host = repo.seed_user("Hana").await;
        let member = repo.seed_user("Ana").await;
        let trip = seed_trip(repo.as_ref(), host.id).await;
        seed_approved(repo.as_ref(), trip.id, member.id).await;
        let room = repo
            .create_chat_room_if_absent(trip.id)
            .await
            .unwrap()
            .unwrap();

        let sent = send_message(
            State(state.clone()),
            as_user(member.id),
            Path(room.id),
            Json(SendMessageRequest {
                content: Some("See you in Cusco".to_string()),
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(sent.status(), StatusCode::CREATED);

        let listed = list_messages(State(state), as_user(host.id), Path(room.id))
            .await
            .unwrap()
            .into_response();
        let bytes = axum::body::to_bytes(listed.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body[0]["content"], "See you in Cusco");
        assert_eq!(body[0]["sender_name"], "Ana");
    }
}
