//! Review models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Review of one trip member by another
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewee_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub trip_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewee_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
}

/// A review together with the facts its visibility depends on
#[derive(Debug, Clone)]
pub struct ReviewRecord {
    pub review: Review,
    pub trip_end_date: NaiveDate,
    /// Whether the reviewee has reviewed the reviewer for the same trip
    pub has_reciprocal: bool,
}

/// Body of `POST /trips/:id/reviews`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitReviewRequest {
    pub reviewee_id: Option<Uuid>,
    pub rating: Option<i16>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TripRole {
    Host,
    Participant,
}

/// Someone the current user may still review for a trip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewTarget {
    pub user_id: Uuid,
    pub name: String,
    pub role: TripRole,
}
