use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Premium,
    Enterprise,
}

text_enum!(SubscriptionTier, "subscription", {
    Free => "free",
    Premium => "premium",
    Enterprise => "enterprise",
});

impl SubscriptionTier {
    /// Premium users start new exams without buying an attempt.
    pub fn skips_exam_payment(&self) -> bool {
        matches!(self, SubscriptionTier::Premium)
    }
}

/// Account row owned by the auth service. This crate only reads the tier and
/// writes the lifetime counters.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub subscription: SubscriptionTier,
    pub best_score: i32,
    pub target_score: i32,
    pub tests_completed: i32,
    /// Minutes.
    pub total_time_spent: i32,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl User {
    pub fn new(username: &str, email: &str, subscription: SubscriptionTier) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            subscription,
            best_score: 0,
            target_score: 1500,
            tests_completed: 0,
            total_time_spent: 0,
            created_at: now,
            last_active: now,
        }
    }
}
