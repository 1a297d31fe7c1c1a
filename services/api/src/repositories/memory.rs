//! In-memory repository used by the test suite

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Repository, StoreError, StoreResult};
use crate::models::{
    ChatRoom, JoinedTrip, Message, NewReview, NewTrip, NewUser, ParticipantStatus, Review,
    ReviewRecord, TravelStyle, Trip, TripParticipant, TripSearch, TripSort, User,
};

#[derive(Default)]
struct State {
    users: Vec<User>,
    travel_styles: Vec<TravelStyle>,
    user_travel_styles: Vec<(Uuid, Uuid)>,
    trips: Vec<Trip>,
    participants: Vec<TripParticipant>,
    chat_rooms: Vec<ChatRoom>,
    messages: Vec<Message>,
    reviews: Vec<Review>,
}

#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<State>,
    /// Makes chat room creation fail, to exercise best-effort handling
    pub fail_chat_rooms: AtomicBool,
    /// Rejects trips and join requests from users without a profile row
    pub require_profiles: AtomicBool,
}

impl MemoryRepository {
    fn check_profile(&self, state: &State, user_id: Uuid) -> StoreResult<()> {
        if self.require_profiles.load(Ordering::SeqCst)
            && !state.users.iter().any(|u| u.id == user_id)
        {
            return Err(StoreError::MissingReference(format!("users.id = {}", user_id)));
        }
        Ok(())
    }

    /// Insert a user profile directly
    pub async fn seed_user(&self, full_name: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            name: None,
            full_name: Some(full_name.to_string()),
            email: Some(format!("{}@roam.test", full_name.to_lowercase())),
            bio: None,
            avatar_url: None,
            created_at: Utc::now(),
        };
        self.state.lock().await.users.push(user.clone());
        user
    }

    pub async fn seed_travel_style(&self, name: &str) -> TravelStyle {
        let style = TravelStyle {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.state.lock().await.travel_styles.push(style.clone());
        style
    }

    pub async fn chat_room_count(&self, trip_id: Uuid) -> usize {
        let state = self.state.lock().await;
        state.chat_rooms.iter().filter(|r| r.trip_id == trip_id).count()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn ping(&self) -> bool {
        true
    }

    async fn upsert_user(&self, user: &NewUser) -> StoreResult<User> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.users.iter_mut().find(|u| u.id == user.id) {
            if user.email.is_some() {
                existing.email = user.email.clone();
            }
            if user.full_name.is_some() {
                existing.full_name = user.full_name.clone();
            }
            if existing.name.is_none() {
                existing.name = user.full_name.clone();
            }
            return Ok(existing.clone());
        }

        let created = User {
            id: user.id,
            name: user.full_name.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            bio: None,
            avatar_url: None,
            created_at: Utc::now(),
        };
        state.users.push(created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn update_bio(&self, id: Uuid, bio: &str) -> StoreResult<Option<User>> {
        let mut state = self.state.lock().await;
        Ok(state.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.bio = Some(bio.to_string());
            user.clone()
        }))
    }

    async fn list_travel_styles(&self) -> StoreResult<Vec<TravelStyle>> {
        let state = self.state.lock().await;
        let mut styles = state.travel_styles.clone();
        styles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(styles)
    }

    async fn user_travel_styles(&self, user_id: Uuid) -> StoreResult<Vec<TravelStyle>> {
        let state = self.state.lock().await;
        let mut styles: Vec<TravelStyle> = state
            .travel_styles
            .iter()
            .filter(|s| state.user_travel_styles.contains(&(user_id, s.id)))
            .cloned()
            .collect();
        styles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(styles)
    }

    async fn replace_user_travel_styles(
        &self,
        user_id: Uuid,
        style_ids: &[Uuid],
    ) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if let Some(unknown) = style_ids
            .iter()
            .find(|id| !state.travel_styles.iter().any(|s| s.id == **id))
        {
            return Err(StoreError::Corrupt(format!("unknown travel style {}", unknown)));
        }

        state.user_travel_styles.retain(|(user, _)| *user != user_id);
        for style_id in style_ids {
            if !state.user_travel_styles.contains(&(user_id, *style_id)) {
                state.user_travel_styles.push((user_id, *style_id));
            }
        }
        Ok(())
    }

    async fn insert_trip(&self, trip: &NewTrip) -> StoreResult<Trip> {
        let mut state = self.state.lock().await;
        self.check_profile(&state, trip.host_id)?;

        let created = Trip {
            id: Uuid::new_v4(),
            host_id: trip.host_id,
            title: trip.title.clone(),
            destination: trip.destination.clone(),
            description: trip.description.clone(),
            start_date: trip.start_date,
            end_date: trip.end_date,
            budget_min: trip.budget_min,
            budget_max: trip.budget_max,
            max_participants: trip.max_participants,
            latitude: trip.latitude,
            longitude: trip.longitude,
            created_at: Utc::now(),
        };
        state.trips.push(created.clone());
        Ok(created)
    }

    async fn find_trip(&self, id: Uuid) -> StoreResult<Option<Trip>> {
        let state = self.state.lock().await;
        Ok(state.trips.iter().find(|t| t.id == id).cloned())
    }

    async fn search_trips(&self, search: &TripSearch) -> StoreResult<Vec<Trip>> {
        let state = self.state.lock().await;
        let needle = search.destination.as_deref().map(str::to_lowercase);

        let mut trips: Vec<Trip> = state
            .trips
            .iter()
            .filter(|t| t.start_date >= search.from_date)
            .filter(|t| match &needle {
                Some(needle) => t.destination.to_lowercase().contains(needle),
                None => true,
            })
            .cloned()
            .collect();

        match search.sort {
            TripSort::StartDate => trips.sort_by(|a, b| {
                a.start_date
                    .cmp(&b.start_date)
                    .then(b.created_at.cmp(&a.created_at))
            }),
            TripSort::Newest => trips.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }

        Ok(trips
            .into_iter()
            .skip(usize::try_from(search.offset).unwrap_or(0))
            .take(usize::try_from(search.limit).unwrap_or(0))
            .collect())
    }

    async fn trips_hosted_by(&self, host_id: Uuid) -> StoreResult<Vec<Trip>> {
        let state = self.state.lock().await;
        let mut trips: Vec<Trip> = state
            .trips
            .iter()
            .filter(|t| t.host_id == host_id)
            .cloned()
            .collect();
        trips.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(trips)
    }

    async fn insert_participant_if_absent(
        &self,
        trip_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<TripParticipant>> {
        let mut state = self.state.lock().await;
        self.check_profile(&state, user_id)?;
        if state
            .participants
            .iter()
            .any(|p| p.trip_id == trip_id && p.user_id == user_id)
        {
            return Ok(None);
        }

        let participant = TripParticipant {
            id: Uuid::new_v4(),
            trip_id,
            user_id,
            status: ParticipantStatus::Pending,
            joined_at: Utc::now(),
        };
        state.participants.push(participant.clone());
        Ok(Some(participant))
    }

    async fn find_participant(
        &self,
        trip_id: Uuid,
        participant_id: Uuid,
    ) -> StoreResult<Option<TripParticipant>> {
        let state = self.state.lock().await;
        Ok(state
            .participants
            .iter()
            .find(|p| p.id == participant_id && p.trip_id == trip_id)
            .cloned())
    }

    async fn participants_for_trip(&self, trip_id: Uuid) -> StoreResult<Vec<TripParticipant>> {
        let state = self.state.lock().await;
        Ok(state
            .participants
            .iter()
            .filter(|p| p.trip_id == trip_id)
            .cloned()
            .collect())
    }

    async fn participants_for_trips(
        &self,
        trip_ids: &[Uuid],
    ) -> StoreResult<Vec<TripParticipant>> {
        let state = self.state.lock().await;
        Ok(state
            .participants
            .iter()
            .filter(|p| trip_ids.contains(&p.trip_id))
            .cloned()
            .collect())
    }

    async fn resolve_participant(
        &self,
        trip_id: Uuid,
        participant_id: Uuid,
        status: ParticipantStatus,
    ) -> StoreResult<Option<TripParticipant>> {
        let mut state = self.state.lock().await;
        Ok(state
            .participants
            .iter_mut()
            .find(|p| {
                p.id == participant_id
                    && p.trip_id == trip_id
                    && p.status == ParticipantStatus::Pending
            })
            .map(|p| {
                p.status = status;
                p.clone()
            }))
    }

    async fn count_approved(&self, trip_id: Uuid) -> StoreResult<i64> {
        let state = self.state.lock().await;
        let count = state
            .participants
            .iter()
            .filter(|p| p.trip_id == trip_id && p.is_approved())
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn joined_trips(&self, user_id: Uuid) -> StoreResult<Vec<JoinedTrip>> {
        let state = self.state.lock().await;
        let mut joined: Vec<JoinedTrip> = state
            .participants
            .iter()
            .filter(|p| p.user_id == user_id && p.is_approved())
            .filter_map(|p| {
                state
                    .trips
                    .iter()
                    .find(|t| t.id == p.trip_id)
                    .map(|trip| JoinedTrip {
                        participant_id: p.id,
                        joined_at: p.joined_at,
                        trip: trip.clone(),
                    })
            })
            .collect();
        joined.sort_by(|a, b| b.joined_at.cmp(&a.joined_at));
        Ok(joined)
    }

    async fn find_chat_room(&self, id: Uuid) -> StoreResult<Option<ChatRoom>> {
        let state = self.state.lock().await;
        Ok(state.chat_rooms.iter().find(|r| r.id == id).cloned())
    }

    async fn find_chat_room_for_trip(&self, trip_id: Uuid) -> StoreResult<Option<ChatRoom>> {
        let state = self.state.lock().await;
        Ok(state.chat_rooms.iter().find(|r| r.trip_id == trip_id).cloned())
    }

    async fn create_chat_room_if_absent(&self, trip_id: Uuid) -> StoreResult<Option<ChatRoom>> {
        if self.fail_chat_rooms.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut state = self.state.lock().await;
        if state.chat_rooms.iter().any(|r| r.trip_id == trip_id) {
            return Ok(None);
        }

        let room = ChatRoom {
            id: Uuid::new_v4(),
            trip_id,
            created_at: Utc::now(),
        };
        state.chat_rooms.push(room.clone());
        Ok(Some(room))
    }

    async fn insert_message(
        &self,
        chat_room_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> StoreResult<Message> {
        let message = Message {
            id: Uuid::new_v4(),
            chat_room_id,
            sender_id,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.state.lock().await.messages.push(message.clone());
        Ok(message)
    }

    async fn messages_for_room(&self, chat_room_id: Uuid) -> StoreResult<Vec<Message>> {
        let state = self.state.lock().await;
        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.chat_room_id == chat_room_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    async fn insert_review_if_absent(&self, review: &NewReview) -> StoreResult<Option<Review>> {
        let mut state = self.state.lock().await;
        if state.reviews.iter().any(|r| {
            r.trip_id == review.trip_id
                && r.reviewer_id == review.reviewer_id
                && r.reviewee_id == review.reviewee_id
        }) {
            return Ok(None);
        }

        let created = Review {
            id: Uuid::new_v4(),
            trip_id: review.trip_id,
            reviewer_id: review.reviewer_id,
            reviewee_id: review.reviewee_id,
            rating: review.rating,
            comment: review.comment.clone(),
            created_at: Utc::now(),
        };
        state.reviews.push(created.clone());
        Ok(Some(created))
    }

    async fn reviews_by_reviewer(
        &self,
        trip_id: Uuid,
        reviewer_id: Uuid,
    ) -> StoreResult<Vec<Review>> {
        let state = self.state.lock().await;
        Ok(state
            .reviews
            .iter()
            .filter(|r| r.trip_id == trip_id && r.reviewer_id == reviewer_id)
            .cloned()
            .collect())
    }

    async fn reviews_about(&self, reviewee_id: Uuid) -> StoreResult<Vec<ReviewRecord>> {
        let state = self.state.lock().await;
        let mut records: Vec<ReviewRecord> = state
            .reviews
            .iter()
            .filter(|r| r.reviewee_id == reviewee_id)
            .filter_map(|r| {
                let trip = state.trips.iter().find(|t| t.id == r.trip_id)?;
                let has_reciprocal = state.reviews.iter().any(|c| {
                    c.trip_id == r.trip_id
                        && c.reviewer_id == r.reviewee_id
                        && c.reviewee_id == r.reviewer_id
                });
                Some(ReviewRecord {
                    review: r.clone(),
                    trip_end_date: trip.end_date,
                    has_reciprocal,
                })
            })
            .collect();
        records.sort_by(|a, b| b.review.created_at.cmp(&a.review.created_at));
        Ok(records)
    }
}
