//! Post-trip reviews between trip members
//!
//! A member (the host or an approved participant) may review every other
//! member once per trip after the trip has ended. A review stays hidden until
//! the reviewee reviews back or the visibility window has passed.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{WorkflowError, WorkflowResult},
    models::{
        NewReview, Review, ReviewTarget, SubmitReviewRequest, Trip, TripParticipant, TripRole,
        User, start_of_day_utc,
    },
    repositories::Repository,
};

/// Days after a trip ends before unanswered reviews become visible
pub const REVIEW_VISIBILITY_WINDOW_DAYS: i64 = 14;

pub fn is_review_visible(
    has_reciprocal: bool,
    trip_ends_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    has_reciprocal || now - trip_ends_at >= Duration::days(REVIEW_VISIBILITY_WINDOW_DAYS)
}

/// The host and approved participants, with their role on the trip
fn trip_members(trip: &Trip, participants: &[TripParticipant]) -> Vec<(Uuid, TripRole)> {
    let mut members = vec![(trip.host_id, TripRole::Host)];
    members.extend(
        participants
            .iter()
            .filter(|p| p.is_approved() && p.user_id != trip.host_id)
            .map(|p| (p.user_id, TripRole::Participant)),
    );
    members
}

fn role_of(user_id: Uuid, trip: &Trip, participants: &[TripParticipant]) -> Option<TripRole> {
    trip_members(trip, participants)
        .into_iter()
        .find(|(id, _)| *id == user_id)
        .map(|(_, role)| role)
}

/// Whether `reviewer_id` may still review `reviewee_id` for the trip
///
/// `existing` holds the reviews the reviewer already wrote.
pub fn can_submit_review(
    reviewer_id: Uuid,
    reviewee_id: Uuid,
    trip: &Trip,
    participants: &[TripParticipant],
    existing: &[Review],
    now: DateTime<Utc>,
) -> bool {
    trip.has_ended(now)
        && reviewer_id != reviewee_id
        && role_of(reviewer_id, trip, participants).is_some()
        && role_of(reviewee_id, trip, participants).is_some()
        && !existing.iter().any(|r| {
            r.trip_id == trip.id && r.reviewer_id == reviewer_id && r.reviewee_id == reviewee_id
        })
}

/// Members the reviewer may still review
pub fn review_targets(
    reviewer_id: Uuid,
    trip: &Trip,
    participants: &[TripParticipant],
    users: &HashMap<Uuid, User>,
    existing: &[Review],
    now: DateTime<Utc>,
) -> Vec<ReviewTarget> {
    trip_members(trip, participants)
        .into_iter()
        .filter(|(member, _)| {
            can_submit_review(reviewer_id, *member, trip, participants, existing, now)
        })
        .map(|(user_id, role)| {
            let fallback = match role {
                TripRole::Host => "Host",
                TripRole::Participant => "Traveler",
            };
            ReviewTarget {
                user_id,
                name: users
                    .get(&user_id)
                    .map(|u| u.display_name(fallback))
                    .unwrap_or_else(|| fallback.to_string()),
                role,
            }
        })
        .collect()
}

/// Load a trip and list who the user may still review on it
pub async fn pending_review_targets(
    repo: &dyn Repository,
    reviewer_id: Uuid,
    trip_id: Uuid,
    now: DateTime<Utc>,
) -> WorkflowResult<Vec<ReviewTarget>> {
    let trip = repo
        .find_trip(trip_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("Trip not found"))?;
    let participants = repo.participants_for_trip(trip.id).await?;
    let existing = repo.reviews_by_reviewer(trip.id, reviewer_id).await?;

    let member_ids: Vec<Uuid> = trip_members(&trip, &participants)
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    let users: HashMap<Uuid, User> = repo
        .users_by_ids(&member_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(review_targets(
        reviewer_id,
        &trip,
        &participants,
        &users,
        &existing,
        now,
    ))
}

pub async fn submit_review(
    repo: &dyn Repository,
    reviewer_id: Uuid,
    trip_id: Uuid,
    request: SubmitReviewRequest,
    now: DateTime<Utc>,
) -> WorkflowResult<Review> {
    let rating = match request.rating {
        None | Some(0) => return Err(WorkflowError::validation("Please select a rating")),
        Some(rating) if !(1..=5).contains(&rating) => {
            return Err(WorkflowError::validation("Rating must be between 1 and 5"));
        }
        Some(rating) => rating,
    };
    let reviewee_id = request
        .reviewee_id
        .ok_or_else(|| WorkflowError::validation("Please choose who to review"))?;

    let trip = repo
        .find_trip(trip_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("Trip not found"))?;

    if !trip.has_ended(now) {
        return Err(WorkflowError::validation(
            "Reviews open once the trip has ended",
        ));
    }

    let participants = repo.participants_for_trip(trip.id).await?;
    if role_of(reviewer_id, &trip, &participants).is_none() {
        return Err(WorkflowError::authorization(
            "Only the host and approved participants can leave reviews",
        ));
    }
    if reviewee_id == reviewer_id {
        return Err(WorkflowError::validation("You cannot review yourself"));
    }
    if role_of(reviewee_id, &trip, &participants).is_none() {
        return Err(WorkflowError::validation(
            "That traveler was not part of this trip",
        ));
    }

    let new_review = NewReview {
        trip_id: trip.id,
        reviewer_id,
        reviewee_id,
        rating,
        comment: request
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
    };

    let review = repo
        .insert_review_if_absent(&new_review)
        .await?
        .ok_or_else(|| {
            WorkflowError::duplicate("You have already reviewed this traveler for this trip")
        })?;

    info!(
        "User {} reviewed user {} for trip {}",
        reviewer_id, reviewee_id, trip.id
    );
    Ok(review)
}

/// Reviews about a user that third parties may see, newest first
pub async fn visible_reviews_for(
    repo: &dyn Repository,
    reviewee_id: Uuid,
    now: DateTime<Utc>,
) -> WorkflowResult<Vec<Review>> {
    Ok(repo
        .reviews_about(reviewee_id)
        .await?
        .into_iter()
        .filter(|record| {
            is_review_visible(
                record.has_reciprocal,
                start_of_day_utc(record.trip_end_date),
                now,
            )
        })
        .map(|record| record.review)
        .collect())
}
