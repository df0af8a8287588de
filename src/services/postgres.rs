use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgExecutor, PgPool, Postgres, Transaction};
use std::collections::HashSet;
use std::time::Duration;

use crate::core::quota::{QuotaPolicy, SwipeState, SwipeTally};
use crate::models::{
    sorted_pair, ChatKind, ChatRecord, GeoPoint, InteractionHistory, LikeCommit, LikeEdge, LikeOutcome,
    MatchRecord, ReviewStatus, SwipeAction, UserProfile,
};
use crate::services::store::{MatchStore, StoreError, StoreResult, SwipeOutcome};

/// Review status as stored in the `review_status` Postgres enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "review_status", rename_all = "lowercase")]
pub enum DbReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl From<ReviewStatus> for DbReviewStatus {
    fn from(value: ReviewStatus) -> Self {
        match value {
            ReviewStatus::Pending => DbReviewStatus::Pending,
            ReviewStatus::Approved => DbReviewStatus::Approved,
            ReviewStatus::Rejected => DbReviewStatus::Rejected,
        }
    }
}

impl From<DbReviewStatus> for ReviewStatus {
    fn from(value: DbReviewStatus) -> Self {
        match value {
            DbReviewStatus::Pending => ReviewStatus::Pending,
            DbReviewStatus::Approved => ReviewStatus::Approved,
            DbReviewStatus::Rejected => ReviewStatus::Rejected,
        }
    }
}

#[derive(FromRow)]
struct UserRow {
    user_id: String,
    display_name: String,
    school: String,
    location: String,
    age: i16,
    interests: Vec<String>,
    is_premium: bool,
    last_latitude: Option<f64>,
    last_longitude: Option<f64>,
    is_active: bool,
    review_status: DbReviewStatus,
    daily_swipe_count: i32,
    last_swipe_reset_at: Option<DateTime<Utc>>,
}

impl UserRow {
    fn to_domain(self) -> StoreResult<UserProfile> {
        let age = u8::try_from(self.age)
            .map_err(|_| StoreError::InvalidRow(format!("age {} out of range for user {}", self.age, self.user_id)))?;
        let daily_swipe_count = swipe_count_from_db(self.daily_swipe_count, &self.user_id)?;

        let last_location = match (self.last_latitude, self.last_longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint { latitude, longitude }),
            _ => None,
        };

        Ok(UserProfile {
            user_id: self.user_id,
            display_name: self.display_name,
            school: self.school,
            location: self.location,
            age,
            interests: self.interests,
            is_premium: self.is_premium,
            last_location,
            is_active: self.is_active,
            review_status: self.review_status.into(),
            daily_swipe_count,
            last_swipe_reset_at: self.last_swipe_reset_at,
        })
    }
}

#[derive(FromRow)]
struct SwipeRow {
    daily_swipe_count: i32,
    last_swipe_reset_at: Option<DateTime<Utc>>,
    is_premium: bool,
}

impl SwipeRow {
    fn to_domain(self, user_id: &str) -> StoreResult<SwipeState> {
        Ok(SwipeState {
            count: swipe_count_from_db(self.daily_swipe_count, user_id)?,
            last_reset_at: self.last_swipe_reset_at,
            is_premium: self.is_premium,
        })
    }
}

fn swipe_count_from_db(count: i32, user_id: &str) -> StoreResult<u32> {
    u32::try_from(count)
        .map_err(|_| StoreError::InvalidRow(format!("swipe count {} out of range for user {}", count, user_id)))
}

fn swipe_count_to_db(count: u32, user_id: &str) -> StoreResult<i32> {
    i32::try_from(count)
        .map_err(|_| StoreError::InvalidRow(format!("swipe count {} out of range for user {}", count, user_id)))
}

#[derive(FromRow)]
struct LikeRow {
    from_user_id: String,
    to_user_id: String,
    created_at: DateTime<Utc>,
    is_reciprocated: bool,
}

#[derive(FromRow)]
struct MatchRow {
    match_id: String,
    user_a: String,
    user_b: String,
    chat_id: String,
    created_at: DateTime<Utc>,
    is_friend: bool,
}

impl MatchRow {
    fn to_domain(self) -> MatchRecord {
        MatchRecord {
            match_id: self.match_id,
            users: [self.user_a, self.user_b],
            chat_id: self.chat_id,
            created_at: self.created_at,
            is_friend: self.is_friend,
        }
    }
}

#[derive(FromRow)]
struct ChatRow {
    chat_id: String,
    participants: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const USER_COLUMNS: &str = r#"
    user_id, display_name, school, location, age, interests, is_premium,
    last_latitude, last_longitude, is_active, review_status,
    daily_swipe_count, last_swipe_reset_at
"#;

/// PostgreSQL-backed match store
///
/// Likes run inside a transaction holding an advisory lock derived from the
/// match id, so the two directions of a pair are serialized and at most one
/// match row can ever be written for it.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new store from a connection string and run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new store from settings, filling in pool defaults
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> StoreResult<Self> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Wrap an existing pool without running migrations
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert the like and, on an unreciprocated reverse edge, create the match
    ///
    /// The caller must hold the pair lock.
    async fn apply_like(tx: &mut Transaction<'_, Postgres>, commit: &LikeCommit) -> StoreResult<LikeOutcome> {
        let reverse: Option<bool> = sqlx::query_scalar(
            "SELECT is_reciprocated FROM likes WHERE from_user_id = $1 AND to_user_id = $2",
        )
        .bind(&commit.to_user_id)
        .bind(&commit.from_user_id)
        .fetch_optional(&mut **tx)
        .await?;

        let is_match = reverse == Some(false);

        // An existing reciprocated edge is never downgraded
        sqlx::query(
            r#"
            INSERT INTO likes (from_user_id, to_user_id, created_at, is_reciprocated)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (from_user_id, to_user_id)
            DO UPDATE SET is_reciprocated = likes.is_reciprocated OR EXCLUDED.is_reciprocated
            "#,
        )
        .bind(&commit.from_user_id)
        .bind(&commit.to_user_id)
        .bind(commit.at)
        .bind(is_match)
        .execute(&mut **tx)
        .await?;

        if !is_match {
            return Ok(LikeOutcome::no_match());
        }

        sqlx::query("UPDATE likes SET is_reciprocated = TRUE WHERE from_user_id = $1 AND to_user_id = $2")
            .bind(&commit.to_user_id)
            .bind(&commit.from_user_id)
            .execute(&mut **tx)
            .await?;

        let (user_a, user_b) = sorted_pair(&commit.from_user_id, &commit.to_user_id);

        let inserted = sqlx::query(
            r#"
            INSERT INTO matches (match_id, user_a, user_b, chat_id, created_at, is_friend)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            ON CONFLICT (match_id) DO NOTHING
            "#,
        )
        .bind(&commit.match_id)
        .bind(user_a)
        .bind(user_b)
        .bind(&commit.chat_id)
        .bind(commit.at)
        .execute(&mut **tx)
        .await?;

        if inserted.rows_affected() == 1 {
            sqlx::query(
                r#"
                INSERT INTO chats (chat_id, kind, participants, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $4)
                "#,
            )
            .bind(&commit.chat_id)
            .bind(ChatKind::Direct.as_str())
            .bind(vec![user_a.to_string(), user_b.to_string()])
            .bind(commit.at)
            .execute(&mut **tx)
            .await?;
        } else {
            tracing::warn!("Match {} already existed, keeping its chat", commit.match_id);
        }

        Ok(LikeOutcome::matched(commit.match_id.clone()))
    }

    /// Lock the user's swipe counter, advance it and write it back
    async fn advance_swipe(
        tx: &mut Transaction<'_, Postgres>,
        user_id: &str,
        now: DateTime<Utc>,
        policy: &QuotaPolicy,
    ) -> StoreResult<SwipeTally> {
        // NO KEY UPDATE leaves the FK key-share locks taken by like inserts unblocked
        let row = sqlx::query_as::<_, SwipeRow>(
            "SELECT daily_swipe_count, last_swipe_reset_at, is_premium FROM users WHERE user_id = $1 FOR NO KEY UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Profile not found for user {}", user_id)))?;

        let tally = policy.advance(row.to_domain(user_id)?, now)?;

        sqlx::query(
            r#"
            UPDATE users
            SET daily_swipe_count = $2, last_swipe_reset_at = $3, updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(swipe_count_to_db(tally.count, user_id)?)
        .bind(tally.last_reset_at)
        .execute(&mut **tx)
        .await?;

        Ok(tally)
    }

    async fn insert_decline<'e, E>(executor: E, from_user_id: &str, to_user_id: &str, at: DateTime<Utc>) -> StoreResult<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO declines (from_user_id, to_user_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (from_user_id, to_user_id) DO NOTHING
            "#,
        )
        .bind(from_user_id)
        .bind(to_user_id)
        .bind(at)
        .execute(executor)
        .await?;

        Ok(())
    }

    async fn lock_pair(tx: &mut Transaction<'_, Postgres>, match_id: &str) -> StoreResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(match_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn ids(&self, query: &str, user_id: &str) -> StoreResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}

#[async_trait]
impl MatchStore for PostgresStore {
    async fn get_profile(&self, user_id: &str) -> StoreResult<UserProfile> {
        let query = format!("SELECT {} FROM users WHERE user_id = $1", USER_COLUMNS);

        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| StoreError::NotFound(format!("Profile not found for user {}", user_id)))?
            .to_domain()
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> StoreResult<()> {
        let query = r#"
            INSERT INTO users (
                user_id, display_name, school, location, age, interests, is_premium,
                last_latitude, last_longitude, is_active, review_status,
                daily_swipe_count, last_swipe_reset_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW(), NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET
                display_name = EXCLUDED.display_name,
                school = EXCLUDED.school,
                location = EXCLUDED.location,
                age = EXCLUDED.age,
                interests = EXCLUDED.interests,
                is_premium = EXCLUDED.is_premium,
                last_latitude = EXCLUDED.last_latitude,
                last_longitude = EXCLUDED.last_longitude,
                is_active = EXCLUDED.is_active,
                review_status = EXCLUDED.review_status,
                daily_swipe_count = EXCLUDED.daily_swipe_count,
                last_swipe_reset_at = EXCLUDED.last_swipe_reset_at,
                updated_at = NOW()
        "#;

        sqlx::query(query)
            .bind(&profile.user_id)
            .bind(&profile.display_name)
            .bind(&profile.school)
            .bind(&profile.location)
            .bind(i16::from(profile.age))
            .bind(&profile.interests)
            .bind(profile.is_premium)
            .bind(profile.last_location.map(|p| p.latitude))
            .bind(profile.last_location.map(|p| p.longitude))
            .bind(profile.is_active)
            .bind(DbReviewStatus::from(profile.review_status))
            .bind(swipe_count_to_db(profile.daily_swipe_count, &profile.user_id)?)
            .bind(profile.last_swipe_reset_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_eligible_profiles(&self) -> StoreResult<Vec<UserProfile>> {
        let query = format!(
            "SELECT {} FROM users WHERE is_active = TRUE AND review_status = 'approved' ORDER BY created_at, user_id",
            USER_COLUMNS
        );

        let rows = sqlx::query_as::<_, UserRow>(&query).fetch_all(&self.pool).await?;

        tracing::debug!("Loaded {} eligible profiles", rows.len());

        rows.into_iter().map(UserRow::to_domain).collect()
    }

    async fn matchable_ids(&self) -> StoreResult<HashSet<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM users WHERE is_active = TRUE AND review_status = 'approved'",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }

    async fn interaction_history(&self, user_id: &str) -> StoreResult<InteractionHistory> {
        let (liked, blocked, blocked_by, matched, liked_by_pending) = tokio::try_join!(
            self.ids("SELECT to_user_id FROM likes WHERE from_user_id = $1", user_id),
            self.ids("SELECT blocked_id FROM blocks WHERE blocker_id = $1", user_id),
            self.ids("SELECT blocker_id FROM blocks WHERE blocked_id = $1", user_id),
            self.ids(
                "SELECT CASE WHEN user_a = $1 THEN user_b ELSE user_a END FROM matches WHERE user_a = $1 OR user_b = $1",
                user_id,
            ),
            self.ids(
                "SELECT from_user_id FROM likes WHERE to_user_id = $1 AND is_reciprocated = FALSE",
                user_id,
            ),
        )?;

        let mut history = InteractionHistory {
            liked: liked.into_iter().collect(),
            blocked: blocked.into_iter().collect(),
            matched: matched.into_iter().collect(),
            liked_by_pending: liked_by_pending.into_iter().collect(),
        };
        history.blocked.extend(blocked_by);

        tracing::debug!(
            "History for {}: {} liked, {} blocked, {} matched, {} pending likers",
            user_id,
            history.liked.len(),
            history.blocked.len(),
            history.matched.len(),
            history.liked_by_pending.len()
        );

        Ok(history)
    }

    async fn commit_like(&self, commit: &LikeCommit) -> StoreResult<LikeOutcome> {
        let mut tx = self.pool.begin().await?;
        Self::lock_pair(&mut tx, &commit.match_id).await?;

        let outcome = Self::apply_like(&mut tx, commit).await?;

        tx.commit().await?;

        Ok(outcome)
    }

    async fn record_decline(&self, from_user_id: &str, to_user_id: &str, at: DateTime<Utc>) -> StoreResult<()> {
        Self::insert_decline(&self.pool, from_user_id, to_user_id, at).await?;

        tracing::debug!("Recorded decline: {} -> {}", from_user_id, to_user_id);

        Ok(())
    }

    async fn record_block(&self, blocker_id: &str, blocked_id: &str, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO blocks (blocker_id, blocked_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (blocker_id, blocked_id) DO NOTHING
            "#,
        )
        .bind(blocker_id)
        .bind(blocked_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Recorded block: {} -> {}", blocker_id, blocked_id);

        Ok(())
    }

    async fn record_swipe(&self, user_id: &str, now: DateTime<Utc>, policy: &QuotaPolicy) -> StoreResult<SwipeTally> {
        let mut tx = self.pool.begin().await?;

        // On error the transaction is dropped and rolled back
        let tally = Self::advance_swipe(&mut tx, user_id, now, policy).await?;

        tx.commit().await?;

        Ok(tally)
    }

    async fn commit_swipe(
        &self,
        commit: &LikeCommit,
        action: SwipeAction,
        policy: &QuotaPolicy,
    ) -> StoreResult<SwipeOutcome> {
        let mut tx = self.pool.begin().await?;

        // pair lock first, then the quota row
        if action == SwipeAction::Like {
            Self::lock_pair(&mut tx, &commit.match_id).await?;
        }

        let tally = Self::advance_swipe(&mut tx, &commit.from_user_id, commit.at, policy).await?;

        let like = match action {
            SwipeAction::Like => Some(Self::apply_like(&mut tx, commit).await?),
            SwipeAction::Decline => {
                Self::insert_decline(&mut *tx, &commit.from_user_id, &commit.to_user_id, commit.at).await?;
                None
            }
        };

        tx.commit().await?;

        Ok(SwipeOutcome { tally, like })
    }

    async fn swipe_state(&self, user_id: &str) -> StoreResult<SwipeState> {
        let row = sqlx::query_as::<_, SwipeRow>(
            "SELECT daily_swipe_count, last_swipe_reset_at, is_premium FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Profile not found for user {}", user_id)))?;

        row.to_domain(user_id)
    }

    async fn list_matches(&self, user_id: &str) -> StoreResult<Vec<MatchRecord>> {
        let rows = sqlx::query_as::<_, MatchRow>(
            r#"
            SELECT match_id, user_a, user_b, chat_id, created_at, is_friend
            FROM matches
            WHERE user_a = $1 OR user_b = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MatchRow::to_domain).collect())
    }

    async fn get_like(&self, from_user_id: &str, to_user_id: &str) -> StoreResult<Option<LikeEdge>> {
        let row = sqlx::query_as::<_, LikeRow>(
            "SELECT from_user_id, to_user_id, created_at, is_reciprocated FROM likes WHERE from_user_id = $1 AND to_user_id = $2",
        )
        .bind(from_user_id)
        .bind(to_user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| LikeEdge {
            from_user_id: r.from_user_id,
            to_user_id: r.to_user_id,
            created_at: r.created_at,
            is_reciprocated: r.is_reciprocated,
        }))
    }

    async fn get_chat(&self, chat_id: &str) -> StoreResult<Option<ChatRecord>> {
        let row = sqlx::query_as::<_, ChatRow>(
            "SELECT chat_id, participants, created_at, updated_at FROM chats WHERE chat_id = $1",
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| ChatRecord {
            chat_id: r.chat_id,
            kind: ChatKind::Direct,
            participants: r.participants,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }))
    }

    async fn health_check(&self) -> StoreResult<bool> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
