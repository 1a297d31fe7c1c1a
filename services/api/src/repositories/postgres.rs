//! PostgreSQL implementation of the repository

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use tracing::info;
use uuid::Uuid;

use super::{Repository, StoreError, StoreResult};
use crate::models::{
    ChatRoom, JoinedTrip, Message, NewReview, NewTrip, NewUser, ParticipantStatus, Review,
    ReviewRecord, TravelStyle, Trip, TripParticipant, TripSearch, TripSort, User,
};

const USER_COLUMNS: &str = "id, name, full_name, email, bio, avatar_url, created_at";

const TRIP_COLUMNS: &str = "id, host_id, title, destination, description, start_date, end_date, \
     budget_min, budget_max, max_participants, latitude, longitude, created_at";

const PARTICIPANT_COLUMNS: &str = "id, trip_id, user_id, status, joined_at";

const REVIEW_COLUMNS: &str =
    "id, trip_id, reviewer_id, reviewee_id, rating, comment, created_at";

/// Repository backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    /// Create a new repository over an initialized pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn participant_from_row(row: &PgRow) -> StoreResult<TripParticipant> {
    let status: String = row.try_get("status")?;
    let status = status.parse::<ParticipantStatus>().map_err(StoreError::Corrupt)?;

    Ok(TripParticipant {
        id: row.try_get("id")?,
        trip_id: row.try_get("trip_id")?,
        user_id: row.try_get("user_id")?,
        status,
        joined_at: row.try_get("joined_at")?,
    })
}

/// Escape `%`, `_` and `\` so user input matches literally inside ILIKE
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl Repository for PgRepository {
    async fn ping(&self) -> bool {
        common::database::health_check(&self.pool)
            .await
            .unwrap_or(false)
    }

    async fn upsert_user(&self, user: &NewUser) -> StoreResult<User> {
        let query = format!(
            r#"
            INSERT INTO users (id, email, full_name, name)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (id) DO UPDATE SET
                email = COALESCE(EXCLUDED.email, users.email),
                full_name = COALESCE(EXCLUDED.full_name, users.full_name),
                name = COALESCE(users.name, EXCLUDED.name),
                updated_at = NOW()
            RETURNING {USER_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, User>(&query)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.full_name)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)");
        let users = sqlx::query_as::<_, User>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn update_bio(&self, id: Uuid, bio: &str) -> StoreResult<Option<User>> {
        let query = format!(
            "UPDATE users SET bio = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(bio)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_travel_styles(&self) -> StoreResult<Vec<TravelStyle>> {
        let styles = sqlx::query_as::<_, TravelStyle>(
            "SELECT id, name, created_at FROM travel_styles ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(styles)
    }

    async fn user_travel_styles(&self, user_id: Uuid) -> StoreResult<Vec<TravelStyle>> {
        let styles = sqlx::query_as::<_, TravelStyle>(
            r#"
            SELECT s.id, s.name, s.created_at
            FROM user_travel_styles us
            JOIN travel_styles s ON s.id = us.travel_style_id
            WHERE us.user_id = $1
            ORDER BY s.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(styles)
    }

    async fn replace_user_travel_styles(
        &self,
        user_id: Uuid,
        style_ids: &[Uuid],
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_travel_styles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if !style_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO user_travel_styles (user_id, travel_style_id)
                SELECT $1, style_id FROM UNNEST($2::uuid[]) AS style_id
                ON CONFLICT (user_id, travel_style_id) DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(style_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn insert_trip(&self, trip: &NewTrip) -> StoreResult<Trip> {
        let query = format!(
            r#"
            INSERT INTO trips (host_id, title, destination, description, start_date, end_date,
                               budget_min, budget_max, max_participants, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {TRIP_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, Trip>(&query)
            .bind(trip.host_id)
            .bind(&trip.title)
            .bind(&trip.destination)
            .bind(&trip.description)
            .bind(trip.start_date)
            .bind(trip.end_date)
            .bind(trip.budget_min)
            .bind(trip.budget_max)
            .bind(trip.max_participants)
            .bind(trip.latitude)
            .bind(trip.longitude)
            .fetch_one(&self.pool)
            .await?;

        info!("Inserted trip {} for host {}", created.id, created.host_id);
        Ok(created)
    }

    async fn find_trip(&self, id: Uuid) -> StoreResult<Option<Trip>> {
        let query = format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = $1");
        let trip = sqlx::query_as::<_, Trip>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(trip)
    }

    async fn search_trips(&self, search: &TripSearch) -> StoreResult<Vec<Trip>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {TRIP_COLUMNS} FROM trips WHERE start_date >= "));
        builder.push_bind(search.from_date);

        if let Some(destination) = &search.destination {
            builder
                .push(" AND destination ILIKE ")
                .push_bind(format!("%{}%", escape_like(destination)));
        }

        match search.sort {
            TripSort::StartDate => builder.push(" ORDER BY start_date ASC, created_at DESC"),
            TripSort::Newest => builder.push(" ORDER BY created_at DESC"),
        };

        builder
            .push(" LIMIT ")
            .push_bind(search.limit)
            .push(" OFFSET ")
            .push_bind(search.offset);

        let trips = builder
            .build_query_as::<Trip>()
            .fetch_all(&self.pool)
            .await?;
        Ok(trips)
    }

    async fn trips_hosted_by(&self, host_id: Uuid) -> StoreResult<Vec<Trip>> {
        let query = format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE host_id = $1 ORDER BY created_at DESC"
        );
        let trips = sqlx::query_as::<_, Trip>(&query)
            .bind(host_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(trips)
    }

    async fn insert_participant_if_absent(
        &self,
        trip_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<TripParticipant>> {
        let query = format!(
            r#"
            INSERT INTO trip_participants (trip_id, user_id, status)
            VALUES ($1, $2, 'pending')
            ON CONFLICT (trip_id, user_id) DO NOTHING
            RETURNING {PARTICIPANT_COLUMNS}
            "#
        );

        let row = sqlx::query(&query)
            .bind(trip_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(participant_from_row).transpose()
    }

    async fn find_participant(
        &self,
        trip_id: Uuid,
        participant_id: Uuid,
    ) -> StoreResult<Option<TripParticipant>> {
        let query = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM trip_participants WHERE id = $1 AND trip_id = $2"
        );
        let row = sqlx::query(&query)
            .bind(participant_id)
            .bind(trip_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(participant_from_row).transpose()
    }

    async fn participants_for_trip(&self, trip_id: Uuid) -> StoreResult<Vec<TripParticipant>> {
        let query = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM trip_participants WHERE trip_id = $1 ORDER BY joined_at"
        );
        let rows = sqlx::query(&query)
            .bind(trip_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(participant_from_row).collect()
    }

    async fn participants_for_trips(
        &self,
        trip_ids: &[Uuid],
    ) -> StoreResult<Vec<TripParticipant>> {
        if trip_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM trip_participants WHERE trip_id = ANY($1)"
        );
        let rows = sqlx::query(&query)
            .bind(trip_ids)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(participant_from_row).collect()
    }

    async fn resolve_participant(
        &self,
        trip_id: Uuid,
        participant_id: Uuid,
        status: ParticipantStatus,
    ) -> StoreResult<Option<TripParticipant>> {
        let query = format!(
            r#"
            UPDATE trip_participants
            SET status = $3
            WHERE id = $1 AND trip_id = $2 AND status = 'pending'
            RETURNING {PARTICIPANT_COLUMNS}
            "#
        );

        let row = sqlx::query(&query)
            .bind(participant_id)
            .bind(trip_id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(participant_from_row).transpose()
    }

    async fn count_approved(&self, trip_id: Uuid) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM trip_participants WHERE trip_id = $1 AND status = 'approved'",
        )
        .bind(trip_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn joined_trips(&self, user_id: Uuid) -> StoreResult<Vec<JoinedTrip>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.host_id, t.title, t.destination, t.description, t.start_date,
                   t.end_date, t.budget_min, t.budget_max, t.max_participants, t.latitude,
                   t.longitude, t.created_at,
                   p.id AS participant_id, p.joined_at
            FROM trip_participants p
            JOIN trips t ON t.id = p.trip_id
            WHERE p.user_id = $1 AND p.status = 'approved'
            ORDER BY p.joined_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<JoinedTrip> {
                Ok(JoinedTrip {
                    participant_id: row.try_get("participant_id")?,
                    joined_at: row.try_get("joined_at")?,
                    trip: Trip::from_row(row)?,
                })
            })
            .collect()
    }

    async fn find_chat_room(&self, id: Uuid) -> StoreResult<Option<ChatRoom>> {
        let room = sqlx::query_as::<_, ChatRoom>(
            "SELECT id, trip_id, created_at FROM chat_rooms WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(room)
    }

    async fn find_chat_room_for_trip(&self, trip_id: Uuid) -> StoreResult<Option<ChatRoom>> {
        let room = sqlx::query_as::<_, ChatRoom>(
            "SELECT id, trip_id, created_at FROM chat_rooms WHERE trip_id = $1",
        )
        .bind(trip_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(room)
    }

    async fn create_chat_room_if_absent(&self, trip_id: Uuid) -> StoreResult<Option<ChatRoom>> {
        let room = sqlx::query_as::<_, ChatRoom>(
            r#"
            INSERT INTO chat_rooms (trip_id)
            VALUES ($1)
            ON CONFLICT (trip_id) DO NOTHING
            RETURNING id, trip_id, created_at
            "#,
        )
        .bind(trip_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(room)
    }

    async fn insert_message(
        &self,
        chat_room_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> StoreResult<Message> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (chat_room_id, sender_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, chat_room_id, sender_id, content, created_at
            "#,
        )
        .bind(chat_room_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        Ok(message)
    }

    async fn messages_for_room(&self, chat_room_id: Uuid) -> StoreResult<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, chat_room_id, sender_id, content, created_at
            FROM messages
            WHERE chat_room_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(chat_room_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    async fn insert_review_if_absent(&self, review: &NewReview) -> StoreResult<Option<Review>> {
        let query = format!(
            r#"
            INSERT INTO reviews (trip_id, reviewer_id, reviewee_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (trip_id, reviewer_id, reviewee_id) DO NOTHING
            RETURNING {REVIEW_COLUMNS}
            "#
        );

        let inserted = sqlx::query_as::<_, Review>(&query)
            .bind(review.trip_id)
            .bind(review.reviewer_id)
            .bind(review.reviewee_id)
            .bind(review.rating)
            .bind(&review.comment)
            .fetch_optional(&self.pool)
            .await?;
        Ok(inserted)
    }

    async fn reviews_by_reviewer(
        &self,
        trip_id: Uuid,
        reviewer_id: Uuid,
    ) -> StoreResult<Vec<Review>> {
        let query = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE trip_id = $1 AND reviewer_id = $2"
        );
        let reviews = sqlx::query_as::<_, Review>(&query)
            .bind(trip_id)
            .bind(reviewer_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(reviews)
    }

    async fn reviews_about(&self, reviewee_id: Uuid) -> StoreResult<Vec<ReviewRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.trip_id, r.reviewer_id, r.reviewee_id, r.rating, r.comment,
                   r.created_at, t.end_date,
                   EXISTS (
                       SELECT 1 FROM reviews c
                       WHERE c.trip_id = r.trip_id
                         AND c.reviewer_id = r.reviewee_id
                         AND c.reviewee_id = r.reviewer_id
                   ) AS has_reciprocal
            FROM reviews r
            JOIN trips t ON t.id = r.trip_id
            WHERE r.reviewee_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(reviewee_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<ReviewRecord> {
                Ok(ReviewRecord {
                    review: Review::from_row(row)?,
                    trip_end_date: row.try_get("end_date")?,
                    has_reciprocal: row.try_get("has_reciprocal")?,
                })
            })
            .collect()
    }
}
