//! User profiles and travel styles

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{WorkflowError, WorkflowResult},
    middleware::AuthUser,
    models::{EnsureProfileRequest, NewUser, Profile, TravelStyle, UpdateProfileRequest, User},
    repositories::Repository,
    reviews,
};

/// Create the caller's profile on first sign-in, or refresh its identity fields
///
/// A name given in the request wins over the one carried by the token.
pub async fn ensure_profile(
    repo: &dyn Repository,
    user: &AuthUser,
    request: EnsureProfileRequest,
) -> WorkflowResult<User> {
    let full_name = request
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .or_else(|| user.full_name.clone());

    let profile = repo
        .upsert_user(&NewUser {
            id: user.id,
            email: user.email.clone(),
            full_name,
        })
        .await?;

    Ok(profile)
}

/// Create a profile from the token claims if the caller has none yet
///
/// Trips, join requests, messages and reviews all reference the user's row.
pub async fn ensure_registered(repo: &dyn Repository, user: &AuthUser) -> WorkflowResult<()> {
    if repo.find_user(user.id).await?.is_none() {
        ensure_profile(repo, user, EnsureProfileRequest::default()).await?;
        info!("Profile {} created from token claims", user.id);
    }
    Ok(())
}

pub async fn get_profile(
    repo: &dyn Repository,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> WorkflowResult<Profile> {
    let user = repo
        .find_user(user_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("Profile not found"))?;

    let travel_styles = repo.user_travel_styles(user_id).await?;
    let hosted_trips = repo.trips_hosted_by(user_id).await?.len();
    let joined_trips = repo.joined_trips(user_id).await?.len();
    let reviews = reviews::visible_reviews_for(repo, user_id, now).await?;

    let average_rating = (!reviews.is_empty()).then(|| {
        let total: f64 = reviews.iter().map(|r| f64::from(r.rating)).sum();
        total / reviews.len() as f64
    });

    Ok(Profile {
        user,
        travel_styles,
        hosted_trips,
        joined_trips,
        reviews,
        average_rating,
    })
}

/// Update the caller's bio and replace their travel styles
pub async fn update_profile(
    repo: &dyn Repository,
    user_id: Uuid,
    request: UpdateProfileRequest,
    now: DateTime<Utc>,
) -> WorkflowResult<Profile> {
    let known = repo.list_travel_styles().await?;
    if let Some(unknown) = request
        .travel_style_ids
        .iter()
        .find(|id| !known.iter().any(|s| s.id == **id))
    {
        return Err(WorkflowError::validation(format!(
            "Unknown travel style {}",
            unknown
        )));
    }

    let bio = request.bio.as_deref().map(str::trim).unwrap_or_default();
    repo.update_bio(user_id, bio)
        .await?
        .ok_or_else(|| WorkflowError::not_found("Profile not found"))?;

    let mut style_ids = request.travel_style_ids;
    style_ids.sort_unstable();
    style_ids.dedup();
    repo.replace_user_travel_styles(user_id, &style_ids).await?;

    info!("Profile {} updated", user_id);
    get_profile(repo, user_id, now).await
}

pub async fn list_travel_styles(repo: &dyn Repository) -> WorkflowResult<Vec<TravelStyle>> {
    Ok(repo.list_travel_styles().await?)
}
