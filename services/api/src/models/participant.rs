//! Trip participation models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Status of a join request
///
/// `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Pending,
    Approved,
    Declined,
}

impl ParticipantStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ParticipantStatus::Pending => "pending",
            ParticipantStatus::Approved => "approved",
            ParticipantStatus::Declined => "declined",
        }
    }

    /// Apply a host decision; `None` when the request was already resolved
    pub fn resolve(self, decision: JoinDecision) -> Option<ParticipantStatus> {
        match self {
            ParticipantStatus::Pending => Some(decision.target_status()),
            ParticipantStatus::Approved | ParticipantStatus::Declined => None,
        }
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipantStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ParticipantStatus::Pending),
            "approved" => Ok(ParticipantStatus::Approved),
            "declined" => Ok(ParticipantStatus::Declined),
            other => Err(format!("unknown participant status '{}'", other)),
        }
    }
}

/// Host decision on a pending join request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinDecision {
    Approve,
    Decline,
}

impl JoinDecision {
    pub fn target_status(self) -> ParticipantStatus {
        match self {
            JoinDecision::Approve => ParticipantStatus::Approved,
            JoinDecision::Decline => ParticipantStatus::Declined,
        }
    }

    /// Past-tense verb used in user-facing messages
    pub fn past_tense(self) -> &'static str {
        match self {
            JoinDecision::Approve => "approved",
            JoinDecision::Decline => "declined",
        }
    }
}

impl FromStr for JoinDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "approve" => Ok(JoinDecision::Approve),
            "decline" => Ok(JoinDecision::Decline),
            other => Err(format!("unknown action '{}'", other)),
        }
    }
}

/// One user's request to join one trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripParticipant {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub user_id: Uuid,
    pub status: ParticipantStatus,
    pub joined_at: DateTime<Utc>,
}

impl TripParticipant {
    pub fn is_approved(&self) -> bool {
        self.status == ParticipantStatus::Approved
    }
}

/// Participant with the display name of the user behind it
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantView {
    #[serde(flatten)]
    pub participant: TripParticipant,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// Body of `POST /trips/:id/requests/:participant_id`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolveRequest {
    pub action: Option<String>,
}
