//! Trip lifecycle: creation, join requests, host decisions and listings

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::{
    chat::{self, ChatRoomOutcome},
    error::{WorkflowError, WorkflowResult},
    models::{
        CreateTripRequest, DestinationSummary, JoinDecision, JoinedTrip, LooseNumber, NewTrip,
        ParticipantStatus, ParticipantView, Trip, TripDetails, TripListing, TripParticipant,
        TripSearch, TripSearchQuery, TripSort, User, trip::DEFAULT_MAX_PARTICIPANTS,
        trip::DEFAULT_SEARCH_LIMIT,
    },
    repositories::Repository,
    reviews,
};

const DATE_FORMAT: &str = "%Y-%m-%d";
const UNKNOWN_HOST: &str = "Host";
const UNKNOWN_TRAVELER: &str = "Traveler";

/// Spots left once the host and approved participants are counted
///
/// May be negative when a trip is over-approved.
pub fn compute_available_spots(trip: &Trip, participants: &[TripParticipant]) -> i32 {
    let approved = participants.iter().filter(|p| p.is_approved()).count();
    trip.max_participants
        .saturating_sub(i32::try_from(approved).unwrap_or(i32::MAX))
        .saturating_sub(1)
}

fn required(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(value: &str, field: &str) -> WorkflowResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
        WorkflowError::validation(format!("{} must be a date in YYYY-MM-DD format", field))
    })
}

pub async fn create_trip(
    repo: &dyn Repository,
    host_id: Uuid,
    request: CreateTripRequest,
) -> WorkflowResult<Trip> {
    let (Some(title), Some(destination), Some(start_date), Some(end_date)) = (
        required(request.title.as_deref()),
        required(request.destination.as_deref()),
        required(request.start_date.as_deref()),
        required(request.end_date.as_deref()),
    ) else {
        return Err(WorkflowError::validation(
            "Please fill in all required fields",
        ));
    };

    let start_date = parse_date(start_date, "Start date")?;
    let end_date = parse_date(end_date, "End date")?;
    if end_date < start_date {
        return Err(WorkflowError::validation(
            "End date cannot be before the start date",
        ));
    }

    // A zero budget means no budget was given
    let budget = |value: Option<&LooseNumber>| {
        value.and_then(|n| n.as_i32()).filter(|b| *b != 0)
    };

    let new_trip = NewTrip {
        host_id,
        title: title.to_string(),
        destination: destination.to_string(),
        description: required(request.description.as_deref()).map(str::to_string),
        start_date,
        end_date,
        budget_min: budget(request.budget_min.as_ref()),
        budget_max: budget(request.budget_max.as_ref()),
        max_participants: request
            .max_participants
            .as_ref()
            .and_then(|n| n.as_i32())
            .unwrap_or(DEFAULT_MAX_PARTICIPANTS),
        latitude: request.latitude.as_ref().and_then(|n| n.as_f64()),
        longitude: request.longitude.as_ref().and_then(|n| n.as_f64()),
    };

    let trip = repo.insert_trip(&new_trip).await?;
    info!("Trip {} created by host {}", trip.id, host_id);

    Ok(trip)
}

/// File a pending join request for the user
pub async fn request_to_join(
    repo: &dyn Repository,
    user_id: Uuid,
    trip_id: Uuid,
) -> WorkflowResult<TripParticipant> {
    let trip = repo
        .find_trip(trip_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("Trip not found"))?;

    if trip.is_host(user_id) {
        return Err(WorkflowError::validation("You are hosting this trip"));
    }

    let participant = repo
        .insert_participant_if_absent(trip.id, user_id)
        .await?
        .ok_or_else(|| WorkflowError::duplicate("You have already requested to join this trip"))?;

    info!("User {} requested to join trip {}", user_id, trip.id);
    Ok(participant)
}

/// Result of a host decision
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRequest {
    pub participant: TripParticipant,
    pub chat_room: ChatRoomOutcome,
}

/// Approve or decline a pending join request
///
/// Only pending requests can be resolved. An approval also opens the trip's
/// chat room if it has none yet; a failure there is reported in the outcome
/// and does not undo the approval.
pub async fn resolve_join_request(
    repo: &dyn Repository,
    actor_id: Uuid,
    trip_id: Uuid,
    participant_id: Option<Uuid>,
    action: Option<&str>,
) -> WorkflowResult<ResolvedRequest> {
    let trip = repo
        .find_trip(trip_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("Trip not found"))?;

    if !trip.is_host(actor_id) {
        return Err(WorkflowError::authorization(
            "Only the host can manage join requests",
        ));
    }

    let participant_id =
        participant_id.ok_or_else(|| WorkflowError::validation("Invalid request"))?;
    let decision: JoinDecision = action
        .ok_or_else(|| WorkflowError::validation("Invalid request"))?
        .parse()
        .map_err(|_| WorkflowError::validation("Invalid request"))?;

    let request = repo
        .find_participant(trip.id, participant_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("Join request not found"))?;
    let already_resolved = |status: ParticipantStatus| {
        WorkflowError::validation(format!("This request has already been {}", status))
    };
    let target = request
        .status
        .resolve(decision)
        .ok_or_else(|| already_resolved(request.status))?;

    // The conditional update decides between hosts resolving concurrently
    let participant = match repo
        .resolve_participant(trip.id, request.id, target)
        .await?
    {
        Some(participant) => participant,
        None => {
            let current = repo
                .find_participant(trip.id, request.id)
                .await?
                .ok_or_else(|| WorkflowError::not_found("Join request not found"))?;
            return Err(already_resolved(current.status));
        }
    };

    info!(
        "Join request {} for trip {} {} by host {}",
        participant.id,
        trip.id,
        decision.past_tense(),
        actor_id
    );

    let chat_room = match decision {
        JoinDecision::Approve => chat::open_room_on_first_approval(repo, trip.id).await,
        JoinDecision::Decline => ChatRoomOutcome::NotRequired,
    };

    Ok(ResolvedRequest {
        participant,
        chat_room,
    })
}

/// Attach host names and spot counts to a batch of trips
async fn listings(repo: &dyn Repository, trips: Vec<Trip>) -> WorkflowResult<Vec<TripListing>> {
    let trip_ids: Vec<Uuid> = trips.iter().map(|t| t.id).collect();
    let mut host_ids: Vec<Uuid> = trips.iter().map(|t| t.host_id).collect();
    host_ids.sort_unstable();
    host_ids.dedup();

    let mut participants: HashMap<Uuid, Vec<TripParticipant>> = HashMap::new();
    for participant in repo.participants_for_trips(&trip_ids).await? {
        participants
            .entry(participant.trip_id)
            .or_default()
            .push(participant);
    }

    let hosts: HashMap<Uuid, User> = repo
        .users_by_ids(&host_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(trips
        .into_iter()
        .map(|trip| {
            let members = participants.get(&trip.id).map(Vec::as_slice).unwrap_or(&[]);
            TripListing {
                host_name: hosts
                    .get(&trip.host_id)
                    .map(|h| h.display_name(UNKNOWN_HOST))
                    .unwrap_or_else(|| UNKNOWN_HOST.to_string()),
                approved_count: members.iter().filter(|p| p.is_approved()).count(),
                available_spots: compute_available_spots(&trip, members),
                trip,
            }
        })
        .collect())
}

/// Upcoming trips matching the query
pub async fn search_trips(
    repo: &dyn Repository,
    query: &TripSearchQuery,
    today: NaiveDate,
) -> WorkflowResult<Vec<TripListing>> {
    let search = TripSearch::from_query(query, today);
    let trips = repo.search_trips(&search).await?;
    listings(repo, trips).await
}

/// Upcoming trips grouped by destination, in order of first appearance
pub async fn explore_destinations(
    repo: &dyn Repository,
    today: NaiveDate,
) -> WorkflowResult<Vec<DestinationSummary>> {
    let search = TripSearch {
        destination: None,
        sort: TripSort::Newest,
        from_date: today,
        limit: i64::from(DEFAULT_SEARCH_LIMIT),
        offset: 0,
    };
    let trips = listings(repo, repo.search_trips(&search).await?).await?;

    let mut summaries: Vec<DestinationSummary> = Vec::new();
    for listing in trips {
        let spots = listing.available_spots.max(0);
        match summaries
            .iter_mut()
            .find(|s| s.destination == listing.trip.destination)
        {
            Some(summary) => {
                summary.trip_count += 1;
                summary.available_spots += spots;
                summary.trips.push(listing);
            }
            None => summaries.push(DestinationSummary {
                destination: listing.trip.destination.clone(),
                trip_count: 1,
                available_spots: spots,
                trips: vec![listing],
            }),
        }
    }

    Ok(summaries)
}

/// Trips hosted by the user, newest first
pub async fn hosted_trips(repo: &dyn Repository, host_id: Uuid) -> WorkflowResult<Vec<TripListing>> {
    let trips = repo.trips_hosted_by(host_id).await?;
    listings(repo, trips).await
}

/// Trips the user joined as an approved participant
pub async fn joined_trips(repo: &dyn Repository, user_id: Uuid) -> WorkflowResult<Vec<JoinedTrip>> {
    Ok(repo.joined_trips(user_id).await?)
}

fn participant_views(
    participants: &[TripParticipant],
    status: ParticipantStatus,
    users: &HashMap<Uuid, User>,
) -> Vec<ParticipantView> {
    participants
        .iter()
        .filter(|p| p.status == status)
        .map(|p| {
            let user = users.get(&p.user_id);
            ParticipantView {
                participant: p.clone(),
                name: user
                    .map(|u| u.display_name(UNKNOWN_TRAVELER))
                    .unwrap_or_else(|| UNKNOWN_TRAVELER.to_string()),
                avatar_url: user.and_then(|u| u.avatar_url.clone()),
            }
        })
        .collect()
}

/// Trip page as seen by `viewer_id`
pub async fn trip_details(
    repo: &dyn Repository,
    viewer_id: Uuid,
    trip_id: Uuid,
    now: DateTime<Utc>,
) -> WorkflowResult<TripDetails> {
    let trip = repo
        .find_trip(trip_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("Trip not found"))?;
    let participants = repo.participants_for_trip(trip.id).await?;

    let mut user_ids: Vec<Uuid> = participants.iter().map(|p| p.user_id).collect();
    user_ids.push(trip.host_id);
    let users: HashMap<Uuid, User> = repo
        .users_by_ids(&user_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let is_host = trip.is_host(viewer_id);
    let can_access_chat = chat::can_access_chat(viewer_id, &trip, &participants);
    let chat_room_id = if can_access_chat {
        repo.find_chat_room_for_trip(trip.id).await?.map(|r| r.id)
    } else {
        None
    };

    let review_targets = if trip.has_ended(now) {
        let existing = repo.reviews_by_reviewer(trip.id, viewer_id).await?;
        reviews::review_targets(viewer_id, &trip, &participants, &users, &existing, now)
    } else {
        Vec::new()
    };

    let approved = participant_views(&participants, ParticipantStatus::Approved, &users);
    let pending_requests = if is_host {
        participant_views(&participants, ParticipantStatus::Pending, &users)
    } else {
        Vec::new()
    };

    Ok(TripDetails {
        host: users.get(&trip.host_id).cloned(),
        is_host,
        viewer_status: participants
            .iter()
            .find(|p| p.user_id == viewer_id)
            .map(|p| p.status),
        group_size: i32::try_from(approved.len())
            .unwrap_or(i32::MAX)
            .saturating_add(1),
        available_spots: compute_available_spots(&trip, &participants),
        participants: approved,
        pending_requests,
        can_access_chat,
        chat_room_id,
        review_targets,
        trip,
    })
}
