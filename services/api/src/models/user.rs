//! User profile models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::review::Review;

/// User profile row
///
/// Serializes without the email; only [`Account`] exposes it, to its owner.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub full_name: Option<String>,
    #[serde(skip_serializing)]
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Name shown to other travelers, preferring the full name
    pub fn display_name(&self, fallback: &str) -> String {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.name.as_deref().filter(|n| !n.trim().is_empty()))
            .unwrap_or(fallback)
            .to_string()
    }
}

/// The caller's own profile, as returned by `POST /me`
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    #[serde(flatten)]
    pub user: User,
    pub email: Option<String>,
}

impl From<User> for Account {
    fn from(user: User) -> Self {
        Account {
            email: user.email.clone(),
            user,
        }
    }
}

/// Profile upsert payload, keyed by the identity provider's user id
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

/// Body of `POST /me`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnsureProfileRequest {
    pub full_name: Option<String>,
}

/// Body of `PUT /me/profile`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub bio: Option<String>,
    #[serde(default)]
    pub travel_style_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TravelStyle {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Public profile page
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub user: User,
    pub travel_styles: Vec<TravelStyle>,
    pub hosted_trips: usize,
    pub joined_trips: usize,
    pub reviews: Vec<Review>,
    pub average_rating: Option<f64>,
}
