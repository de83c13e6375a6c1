use chrono::Utc;

use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::Subscription;

#[derive(Clone)]
pub struct SubscriptionService {
    pool: DbPool,
}

impl SubscriptionService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Activate or extend in a single upsert. An active subscription stacks
    /// the new duration on top of the remaining time; a missing or expired
    /// one restarts from now. One statement per call keeps concurrent
    /// extensions for the same user from overwriting each other, and
    /// expires_at only ever moves forward.
    pub async fn activate_or_extend(
        &self,
        user_id: i64,
        duration_days: i64,
    ) -> AppResult<Subscription> {
        if duration_days <= 0 {
            return Err(AppError::ValidationError(format!(
                "Subscription duration must be positive, got {duration_days}"
            )));
        }
        let modifier = format!("+{duration_days} days");

        sqlx::query(
            "INSERT INTO subscriptions (user_id, expires_at) \
             VALUES (?1, datetime('now', ?2)) \
             ON CONFLICT(user_id) DO UPDATE SET \
                 expires_at = CASE \
                     WHEN subscriptions.expires_at > datetime('now') \
                         THEN datetime(subscriptions.expires_at, ?2) \
                     ELSE datetime('now', ?2) \
                 END",
        )
        .bind(user_id)
        .bind(&modifier)
        .execute(&self.pool)
        .await?;

        let subscription = self.get_subscription(user_id).await?.ok_or_else(|| {
            AppError::InternalError(format!("Subscription missing after upsert for user {user_id}"))
        })?;

        log::info!(
            "Subscription for user {user_id} extended by {duration_days} days, now expires at {}",
            subscription.expires_at
        );
        Ok(subscription)
    }

    pub async fn get_subscription(&self, user_id: i64) -> AppResult<Option<Subscription>> {
        let subscription = sqlx::query_as::<_, Subscription>(
            "SELECT id, user_id, created_at, expires_at FROM subscriptions WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(subscription)
    }

    pub async fn is_active(&self, user_id: i64) -> AppResult<bool> {
        Ok(self
            .get_subscription(user_id)
            .await?
            .map(|s| s.expires_at > Utc::now().naive_utc())
            .unwrap_or(false))
    }
}
