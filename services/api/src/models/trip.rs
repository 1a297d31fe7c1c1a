//! Trip models and search payloads

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::participant::{ParticipantStatus, ParticipantView};
use super::review::ReviewTarget;
use super::user::User;

/// Group size used when a trip does not specify one
pub const DEFAULT_MAX_PARTICIPANTS: i32 = 4;

/// Default page size for trip search
pub const DEFAULT_SEARCH_LIMIT: u32 = 50;

/// Midnight UTC at the start of `date`
pub fn start_of_day_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Trip row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trip {
    pub id: Uuid,
    pub host_id: Uuid,
    pub title: String,
    pub destination: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget_min: Option<i32>,
    pub budget_max: Option<i32>,
    pub max_participants: i32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    pub fn is_host(&self, user_id: Uuid) -> bool {
        self.host_id == user_id
    }

    /// Instant the trip counts as over: the start of its end date, UTC
    pub fn ends_at(&self) -> DateTime<Utc> {
        start_of_day_utc(self.end_date)
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now > self.ends_at()
    }
}

/// Validated trip ready for insertion
#[derive(Debug, Clone)]
pub struct NewTrip {
    pub host_id: Uuid,
    pub title: String,
    pub destination: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget_min: Option<i32>,
    pub budget_max: Option<i32>,
    pub max_participants: i32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A numeric form field that may arrive as a JSON number or as text
///
/// Non-numeric text is treated as absent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            LooseNumber::Number(n) => *n,
            LooseNumber::Text(s) => s.trim().parse().ok()?,
        };
        value.is_finite().then_some(value)
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.as_f64()
            .map(f64::trunc)
            .filter(|v| *v >= f64::from(i32::MIN) && *v <= f64::from(i32::MAX))
            .map(|v| v as i32)
    }
}

/// Body of `POST /trips`
///
/// Everything is optional at the wire level so missing required fields are
/// reported as validation errors rather than deserialization failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTripRequest {
    pub title: Option<String>,
    pub destination: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub budget_min: Option<LooseNumber>,
    pub budget_max: Option<LooseNumber>,
    pub max_participants: Option<LooseNumber>,
    pub latitude: Option<LooseNumber>,
    pub longitude: Option<LooseNumber>,
}

/// Query string of `GET /trips`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripSearchQuery {
    pub destination: Option<String>,
    pub sort_by: Option<String>,
    /// Page number (1-based)
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripSort {
    /// Soonest departure first
    StartDate,
    /// Most recently created first
    Newest,
}

impl TripSort {
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("start_date") => TripSort::StartDate,
            _ => TripSort::Newest,
        }
    }
}

/// Normalized search handed to the repository
#[derive(Debug, Clone)]
pub struct TripSearch {
    pub destination: Option<String>,
    pub sort: TripSort,
    /// Only trips starting on or after this date are returned
    pub from_date: NaiveDate,
    pub limit: i64,
    pub offset: i64,
}

impl TripSearch {
    pub fn from_query(query: &TripSearchQuery, today: NaiveDate) -> Self {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, 100);
        let destination = query
            .destination
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Self {
            destination,
            sort: TripSort::from_param(query.sort_by.as_deref()),
            from_date: today,
            limit: i64::from(limit),
            offset: i64::from(page - 1) * i64::from(limit),
        }
    }
}

/// Trip as shown in search results and dashboards
#[derive(Debug, Clone, Serialize)]
pub struct TripListing {
    #[serde(flatten)]
    pub trip: Trip,
    pub host_name: String,
    pub approved_count: usize,
    pub available_spots: i32,
}

/// Explore page entry: upcoming trips grouped by destination
#[derive(Debug, Clone, Serialize)]
pub struct DestinationSummary {
    pub destination: String,
    pub trip_count: usize,
    /// Sum of available spots across the destination's trips
    pub available_spots: i32,
    pub trips: Vec<TripListing>,
}

/// A trip the user takes part in as an approved participant
#[derive(Debug, Clone, Serialize)]
pub struct JoinedTrip {
    pub participant_id: Uuid,
    pub joined_at: DateTime<Utc>,
    pub trip: Trip,
}

/// Trip page as seen by one viewer
#[derive(Debug, Clone, Serialize)]
pub struct TripDetails {
    pub trip: Trip,
    pub host: Option<User>,
    pub is_host: bool,
    pub viewer_status: Option<ParticipantStatus>,
    pub participants: Vec<ParticipantView>,
    /// Only populated for the host
    pub pending_requests: Vec<ParticipantView>,
    pub group_size: i32,
    pub available_spots: i32,
    pub can_access_chat: bool,
    pub chat_room_id: Option<Uuid>,
    pub review_targets: Vec<ReviewTarget>,
}
