//! Trip chat rooms and the membership rule guarding them
//!
//! A room exists once a trip has its first approved participant. Only the
//! host and approved participants may read or post, and the rule is checked
//! against current data on every call.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{WorkflowError, WorkflowResult},
    models::{ChatRoom, Message, MessageView, Trip, TripParticipant},
    repositories::Repository,
};

/// Name shown for senders without a profile
const UNKNOWN_SENDER: &str = "Traveler";

/// Whether `user_id` may use the trip's chat
pub fn can_access_chat(user_id: Uuid, trip: &Trip, participants: &[TripParticipant]) -> bool {
    trip.is_host(user_id)
        || participants
            .iter()
            .any(|p| p.user_id == user_id && p.is_approved())
}

/// What happened to the trip's chat room after an approval
///
/// Room creation never fails the approval itself.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum ChatRoomOutcome {
    /// The trip has no approved participant
    NotRequired,
    Created(ChatRoom),
    AlreadyExists,
    Failed(String),
}

/// Open the trip's chat room once it has an approved participant
///
/// Any positive count qualifies, so approvals that commit together still
/// open the room; the store keeps it to one room per trip.
pub async fn open_room_on_first_approval(repo: &dyn Repository, trip_id: Uuid) -> ChatRoomOutcome {
    let approved = match repo.count_approved(trip_id).await {
        Ok(count) => count,
        Err(e) => {
            warn!("Could not count approvals for trip {}: {}", trip_id, e);
            return ChatRoomOutcome::Failed(e.to_string());
        }
    };

    if approved < 1 {
        return ChatRoomOutcome::NotRequired;
    }

    match repo.create_chat_room_if_absent(trip_id).await {
        Ok(Some(room)) => {
            info!("Chat room {} opened for trip {}", room.id, trip_id);
            ChatRoomOutcome::Created(room)
        }
        Ok(None) => ChatRoomOutcome::AlreadyExists,
        Err(e) => {
            warn!("Failed to create chat room for trip {}: {}", trip_id, e);
            ChatRoomOutcome::Failed(e.to_string())
        }
    }
}

/// Load a room and its trip, checking the user may use it
async fn authorize_room(
    repo: &dyn Repository,
    user_id: Uuid,
    room_id: Uuid,
) -> WorkflowResult<ChatRoom> {
    let room = repo
        .find_chat_room(room_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("Chat room not found"))?;

    let trip = repo
        .find_trip(room.trip_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("Trip not found"))?;
    let participants = repo.participants_for_trip(trip.id).await?;

    if !can_access_chat(user_id, &trip, &participants) {
        return Err(WorkflowError::authorization(
            "Only the host and approved participants can access this chat",
        ));
    }

    Ok(room)
}

pub async fn send_message(
    repo: &dyn Repository,
    sender_id: Uuid,
    room_id: Uuid,
    content: Option<&str>,
) -> WorkflowResult<Message> {
    let content = content.map(str::trim).unwrap_or_default();
    if content.is_empty() {
        return Err(WorkflowError::validation("Message cannot be empty"));
    }

    let room = authorize_room(repo, sender_id, room_id).await?;
    let message = repo.insert_message(room.id, sender_id, content).await?;

    Ok(message)
}

/// Messages of a room, oldest first, with sender names
pub async fn list_messages(
    repo: &dyn Repository,
    user_id: Uuid,
    room_id: Uuid,
) -> WorkflowResult<Vec<MessageView>> {
    let room = authorize_room(repo, user_id, room_id).await?;
    let messages = repo.messages_for_room(room.id).await?;

    let mut sender_ids: Vec<Uuid> = messages.iter().map(|m| m.sender_id).collect();
    sender_ids.sort_unstable();
    sender_ids.dedup();

    let names: HashMap<Uuid, String> = repo
        .users_by_ids(&sender_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u.display_name(UNKNOWN_SENDER)))
        .collect();

    Ok(messages
        .into_iter()
        .map(|message| {
            let sender_name = names
                .get(&message.sender_id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_SENDER.to_string());
            MessageView {
                message,
                sender_name,
            }
        })
        .collect())
}

/// The trip's room, if it has one and the user may use it
pub async fn chat_room_for_trip(
    repo: &dyn Repository,
    user_id: Uuid,
    trip_id: Uuid,
) -> WorkflowResult<Option<ChatRoom>> {
    let trip = repo
        .find_trip(trip_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("Trip not found"))?;
    let participants = repo.participants_for_trip(trip.id).await?;

    if !can_access_chat(user_id, &trip, &participants) {
        return Err(WorkflowError::authorization(
            "Only the host and approved participants can access this chat",
        ));
    }

    Ok(repo.find_chat_room_for_trip(trip.id).await?)
}
