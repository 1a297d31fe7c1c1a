//! Persistence port for the Roam workflow
//!
//! The workflow modules only talk to [`Repository`]. Inserts that must be
//! unique are expressed as "insert if absent" operations returning `None` on
//! conflict, so duplicate detection is atomic in every implementation.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    ChatRoom, JoinedTrip, Message, NewReview, NewTrip, NewUser, ParticipantStatus, Review,
    ReviewRecord, TravelStyle, Trip, TripParticipant, TripSearch, User,
};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgRepository;

/// Error raised by a repository implementation
#[derive(Error, Debug)]
pub enum StoreError {
    /// Query failed in the database driver
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// A referenced row, usually the user's profile, does not exist
    #[error("missing reference: {0}")]
    MissingReference(String),

    /// A stored value could not be mapped back into the domain
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db) if db.is_foreign_key_violation() => {
                StoreError::MissingReference(db.constraint().unwrap_or("foreign key").to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Repository: Send + Sync {
    /// Check that the store is reachable
    async fn ping(&self) -> bool;

    // Users

    async fn upsert_user(&self, user: &NewUser) -> StoreResult<User>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;
    async fn update_bio(&self, id: Uuid, bio: &str) -> StoreResult<Option<User>>;
    async fn list_travel_styles(&self) -> StoreResult<Vec<TravelStyle>>;
    async fn user_travel_styles(&self, user_id: Uuid) -> StoreResult<Vec<TravelStyle>>;
    /// Replace the user's travel styles with `style_ids` in one transaction
    async fn replace_user_travel_styles(&self, user_id: Uuid, style_ids: &[Uuid])
    -> StoreResult<()>;

    // Trips

    async fn insert_trip(&self, trip: &NewTrip) -> StoreResult<Trip>;
    async fn find_trip(&self, id: Uuid) -> StoreResult<Option<Trip>>;
    async fn search_trips(&self, search: &TripSearch) -> StoreResult<Vec<Trip>>;
    /// Trips hosted by the user, newest first
    async fn trips_hosted_by(&self, host_id: Uuid) -> StoreResult<Vec<Trip>>;

    // Participation

    /// Insert a pending request; `None` if the user already has one for the trip
    async fn insert_participant_if_absent(
        &self,
        trip_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<TripParticipant>>;
    async fn find_participant(
        &self,
        trip_id: Uuid,
        participant_id: Uuid,
    ) -> StoreResult<Option<TripParticipant>>;
    async fn participants_for_trip(&self, trip_id: Uuid) -> StoreResult<Vec<TripParticipant>>;
    async fn participants_for_trips(&self, trip_ids: &[Uuid])
    -> StoreResult<Vec<TripParticipant>>;
    /// Move a pending request to `status`; `None` if it is not pending
    async fn resolve_participant(
        &self,
        trip_id: Uuid,
        participant_id: Uuid,
        status: ParticipantStatus,
    ) -> StoreResult<Option<TripParticipant>>;
    async fn count_approved(&self, trip_id: Uuid) -> StoreResult<i64>;
    /// Approved participations of the user, most recent join first
    async fn joined_trips(&self, user_id: Uuid) -> StoreResult<Vec<JoinedTrip>>;

    // Chat

    async fn find_chat_room(&self, id: Uuid) -> StoreResult<Option<ChatRoom>>;
    async fn find_chat_room_for_trip(&self, trip_id: Uuid) -> StoreResult<Option<ChatRoom>>;
    /// Create the trip's room; `None` if one already exists
    async fn create_chat_room_if_absent(&self, trip_id: Uuid) -> StoreResult<Option<ChatRoom>>;
    async fn insert_message(
        &self,
        chat_room_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> StoreResult<Message>;
    /// Messages of a room, oldest first
    async fn messages_for_room(&self, chat_room_id: Uuid) -> StoreResult<Vec<Message>>;

    // Reviews

    /// Insert a review; `None` if the reviewer already reviewed this reviewee for the trip
    async fn insert_review_if_absent(&self, review: &NewReview) -> StoreResult<Option<Review>>;
    async fn reviews_by_reviewer(&self, trip_id: Uuid, reviewer_id: Uuid)
    -> StoreResult<Vec<Review>>;
    /// Reviews about a user with their visibility facts, newest first
    async fn reviews_about(&self, reviewee_id: Uuid) -> StoreResult<Vec<ReviewRecord>>;
}
