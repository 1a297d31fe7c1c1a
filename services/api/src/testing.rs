//! Fixtures shared by the workflow tests

use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{NewTrip, Trip, trip::DEFAULT_MAX_PARTICIPANTS};
use crate::repositories::Repository;

pub fn new_trip(host_id: Uuid, start_date: NaiveDate, end_date: NaiveDate) -> NewTrip {
    NewTrip {
        host_id,
        title: "Sacred Valley trek".to_string(),
        destination: "Cusco, Peru".to_string(),
        description: None,
        start_date,
        end_date,
        budget_min: None,
        budget_max: None,
        max_participants: DEFAULT_MAX_PARTICIPANTS,
        latitude: None,
        longitude: None,
    }
}

/// Unsaved trip starting in a month
pub fn trip_for(host_id: Uuid) -> Trip {
    let start = Utc::now().date_naive() + Duration::days(30);
    let new = new_trip(host_id, start, start + Duration::days(7));
    Trip {
        id: Uuid::new_v4(),
        host_id: new.host_id,
        title: new.title,
        destination: new.destination,
        description: new.description,
        start_date: new.start_date,
        end_date: new.end_date,
        budget_min: new.budget_min,
        budget_max: new.budget_max,
        max_participants: new.max_participants,
        latitude: new.latitude,
        longitude: new.longitude,
        created_at: Utc::now(),
    }
}

/// Stored trip starting in a month
pub async fn seed_trip(repo: &dyn Repository, host_id: Uuid) -> Trip {
    let start = Utc::now().date_naive() + Duration::days(30);
    seed_trip_between(repo, host_id, start, start + Duration::days(7)).await
}

pub async fn seed_trip_between(
    repo: &dyn Repository,
    host_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Trip {
    repo.insert_trip(&new_trip(host_id, start_date, end_date))
        .await
        .unwrap()
}

/// Add the user to the trip as an approved participant
pub async fn seed_approved(repo: &dyn Repository, trip_id: Uuid, user_id: Uuid) {
    let request = repo
        .insert_participant_if_absent(trip_id, user_id)
        .await
        .unwrap()
        .unwrap();
    repo.resolve_participant(
        trip_id,
        request.id,
        crate::models::ParticipantStatus::Approved,
    )
    .await
    .unwrap()
    .unwrap();
}

mod scenarios {
    use super::*;
    use crate::chat::{self, ChatRoomOutcome};
    use crate::error::WorkflowError;
    use crate::models::{ParticipantStatus, SubmitReviewRequest};
    use crate::repositories::memory::MemoryRepository;
    use crate::{reviews, trips};

    fn rating(reviewee_id: Uuid, rating: i16) -> SubmitReviewRequest {
        SubmitReviewRequest {
            reviewee_id: Some(reviewee_id),
            rating: Some(rating),
            comment: None,
        }
    }

    #[tokio::test]
    async fn join_chat_and_review_a_finished_trip() {
        let repo = MemoryRepository::default();
        let host = repo.seed_user("Hana").await;
        let x = repo.seed_user("Xavi").await;
        let yesterday = Utc::now().date_naive() - Duration::days(1);
        let trip =
            seed_trip_between(&repo, host.id, yesterday - Duration::days(6), yesterday).await;
        assert_eq!(trip.max_participants, 4);

        let request = trips::request_to_join(&repo, x.id, trip.id).await.unwrap();
        assert_eq!(request.status, ParticipantStatus::Pending);

        let resolved =
            trips::resolve_join_request(&repo, host.id, trip.id, Some(request.id), Some("approve"))
                .await
                .unwrap();
        assert_eq!(resolved.participant.status, ParticipantStatus::Approved);
        let room = match resolved.chat_room {
            ChatRoomOutcome::Created(room) => room,
            other => panic!("expected a new chat room, got {:?}", other),
        };

        let message = chat::send_message(&repo, x.id, room.id, Some("hello"))
            .await
            .unwrap();
        assert_eq!(message.sender_id, x.id);
        let seen_by_host = chat::list_messages(&repo, host.id, room.id).await.unwrap();
        assert_eq!(seen_by_host.len(), 1);
        assert_eq!(seen_by_host[0].message.content, "hello");

        let now = Utc::now();
        reviews::submit_review(&repo, x.id, trip.id, rating(host.id, 5), now)
            .await
            .unwrap();
        assert!(
            reviews::visible_reviews_for(&repo, host.id, now)
                .await
                .unwrap()
                .is_empty()
        );

        reviews::submit_review(&repo, host.id, trip.id, rating(x.id, 4), now)
            .await
            .unwrap();
        let about_host = reviews::visible_reviews_for(&repo, host.id, now).await.unwrap();
        let about_x = reviews::visible_reviews_for(&repo, x.id, now).await.unwrap();
        assert_eq!(about_host.len(), 1);
        assert_eq!(about_host[0].rating, 5);
        assert_eq!(about_x.len(), 1);
        assert_eq!(about_x[0].rating, 4);
    }

    #[tokio::test]
    async fn lone_review_shows_after_twenty_days() {
        let repo = MemoryRepository::default();
        let host = repo.seed_user("Hana").await;
        let x = repo.seed_user("Xavi").await;
        let ended = Utc::now().date_naive() - Duration::days(20);
        let trip = seed_trip_between(&repo, host.id, ended - Duration::days(2), ended).await;
        seed_approved(&repo, trip.id, x.id).await;
        let now = Utc::now();

        reviews::submit_review(&repo, x.id, trip.id, rating(host.id, 5), now)
            .await
            .unwrap();

        assert_eq!(
            reviews::visible_reviews_for(&repo, host.id, now)
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(
            reviews::visible_reviews_for(&repo, x.id, now)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn immediate_second_join_request_is_a_duplicate() {
        let repo = MemoryRepository::default();
        let host = repo.seed_user("Hana").await;
        let y = repo.seed_user("Yara").await;
        let trip = seed_trip(&repo, host.id).await;

        let (first, second) = tokio::join!(
            trips::request_to_join(&repo, y.id, trip.id),
            trips::request_to_join(&repo, y.id, trip.id)
        );

        let outcomes = [first.is_ok(), second.is_ok()];
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        assert!(
            matches!(first, Err(WorkflowError::Duplicate(_)))
                || matches!(second, Err(WorkflowError::Duplicate(_)))
        );
        assert_eq!(repo.participants_for_trip(trip.id).await.unwrap().len(), 1);
    }
}
