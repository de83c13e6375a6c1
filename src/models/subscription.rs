use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// One row per user. Active/expired is derived from `expires_at`, never
/// stored; `expires_at` only ever moves forward.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub created_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionResponse {
    pub user_id: i64,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<NaiveDateTime>,
}

impl SubscriptionResponse {
    pub fn from_record(user_id: i64, subscription: Option<Subscription>) -> Self {
        match subscription {
            Some(s) => Self {
                user_id,
                active: s.expires_at > Utc::now().naive_utc(),
                expires_at: Some(s.expires_at),
            },
            None => Self {
                user_id,
                active: false,
                expires_at: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(expires_at: NaiveDateTime) -> Subscription {
        Subscription {
            id: 1,
            user_id: 42,
            created_at: Utc::now().naive_utc(),
            expires_at,
        }
    }

    #[test]
    fn active_is_derived_from_expiry() {
        let now = Utc::now().naive_utc();

        let response = SubscriptionResponse::from_record(42, Some(record(now + Duration::days(3))));
        assert!(response.active);

        let response = SubscriptionResponse::from_record(42, Some(record(now - Duration::days(3))));
        assert!(!response.active);

        let response = SubscriptionResponse::from_record(42, None);
        assert!(!response.active);
        assert!(response.expires_at.is_none());
    }
}
