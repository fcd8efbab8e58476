use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DailyStats {
    pub stat_date: NaiveDate,
    pub tests_completed: i32,
}

/// Users whose latest activity fell on `stat_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DailyActiveUsers {
    pub stat_date: NaiveDate,
    pub active_users: i64,
}
