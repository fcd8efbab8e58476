use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::store::{ExamStore, ModuleFilter, ResultFilter};
use crate::error::{Error, Result};
use crate::models::daily_stats::{DailyActiveUsers, DailyStats};
use crate::models::exam_session::CompletedResult;
use crate::models::payment::PaymentSummary;

const RECENT_SESSIONS: i64 = 10;
const RESULTS_LIMIT: i64 = 100;
/// Signups counted on the dashboard: today and the seven days before.
const SIGNUP_WINDOW_DAYS: i64 = 7;
/// Start of an all-time series when nothing has been recorded yet.
const EMPTY_HISTORY_DAYS: i64 = 30;
pub const DEFAULT_SERIES_DAYS: u32 = 7;
pub const MAX_SERIES_DAYS: u32 = 3650;

/// Range of a per-day chart, always ending today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesWindow {
    /// The last `n` days including today, capped at `MAX_SERIES_DAYS`.
    LastDays(u32),
    /// From the first recorded day.
    All,
}

impl Default for SeriesWindow {
    fn default() -> Self {
        SeriesWindow::LastDays(DEFAULT_SERIES_DAYS)
    }
}

impl FromStr for SeriesWindow {
    type Err = Error;

    /// Accepts `all` or a positive day count. Counts above the cap are
    /// clamped rather than rejected.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(SeriesWindow::All);
        }
        match s.parse::<u64>() {
            Ok(n) if n > 0 => Ok(SeriesWindow::LastDays(
                n.min(u64::from(MAX_SERIES_DAYS)) as u32,
            )),
            _ => Err(Error::BadRequest(
                "days must be a positive number or 'all'".to_string(),
            )),
        }
    }
}

impl SeriesWindow {
    /// First day of the window, or `None` when it starts at the first
    /// recorded day.
    pub fn first_day(&self, today: NaiveDate) -> Result<Option<NaiveDate>> {
        match self {
            SeriesWindow::All => Ok(None),
            SeriesWindow::LastDays(n) => {
                let span = i64::from((*n).clamp(1, MAX_SERIES_DAYS)) - 1;
                today
                    .checked_sub_signed(Duration::days(span))
                    .map(Some)
                    .ok_or_else(|| Error::BadRequest("days out of range".to_string()))
            }
        }
    }
}

fn history_start(first_recorded: Option<NaiveDate>, today: NaiveDate) -> NaiveDate {
    first_recorded
        .or_else(|| today.checked_sub_signed(Duration::days(EMPTY_HISTORY_DAYS)))
        .unwrap_or(today)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_users: i64,
    /// Signups dated within the last week.
    pub new_signups: i64,
    /// Users whose last activity was today.
    pub dau: i64,
    pub completed_exams: i64,
    pub completed_today: i32,
    pub payments: PaymentSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: Uuid,
    pub username: String,
    pub best_score: i32,
    pub tests_completed: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub english_score: i32,
    pub math_score: i32,
    pub total_score: i32,
    pub certificate_id: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressView {
    pub tests_completed: i32,
    pub best_score: i32,
    pub target_score: i32,
    /// Mean total score of the recent sessions listed below.
    pub average_score: i32,
    pub total_time_spent_minutes: i32,
    pub recent: Vec<SessionSummary>,
}

fn days_between(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = from;
    while day <= to {
        days.push(day);
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    days
}

/// One entry per day in `[from, to]`, using zero where nothing was stored.
pub fn zero_fill(rows: &[DailyStats], from: NaiveDate, to: NaiveDate) -> Vec<DailyStats> {
    let counts: HashMap<NaiveDate, i32> = rows
        .iter()
        .map(|r| (r.stat_date, r.tests_completed))
        .collect();
    days_between(from, to)
        .into_iter()
        .map(|day| DailyStats {
            stat_date: day,
            tests_completed: counts.get(&day).copied().unwrap_or(0),
        })
        .collect()
}

pub fn zero_fill_active(
    rows: &[DailyActiveUsers],
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<DailyActiveUsers> {
    let counts: HashMap<NaiveDate, i64> = rows
        .iter()
        .map(|r| (r.stat_date, r.active_users))
        .collect();
    days_between(from, to)
        .into_iter()
        .map(|day| DailyActiveUsers {
            stat_date: day,
            active_users: counts.get(&day).copied().unwrap_or(0),
        })
        .collect()
}

#[derive(Clone)]
pub struct StatsService {
    store: Arc<dyn ExamStore>,
}

impl StatsService {
    pub fn new(store: Arc<dyn ExamStore>) -> Self {
        Self { store }
    }

    pub async fn dashboard(&self) -> Result<DashboardStats> {
        let today = Utc::now().date_naive();
        let completed_today = self
            .store
            .daily_stats(Some(today), today)
            .await?
            .first()
            .map(|d| d.tests_completed)
            .unwrap_or(0);
        let dau = self
            .store
            .active_users_by_day(Some(today), today)
            .await?
            .first()
            .map(|d| d.active_users)
            .unwrap_or(0);
        let signups_from = today
            .checked_sub_signed(Duration::days(SIGNUP_WINDOW_DAYS))
            .unwrap_or(today);
        Ok(DashboardStats {
            total_users: self.store.count_users().await?,
            new_signups: self.store.count_users_created_since(signups_from).await?,
            dau,
            completed_exams: self.store.count_completed_sessions().await?,
            completed_today,
            payments: self.store.payment_summary().await?,
        })
    }

    /// Completions per day over `window`, zero-filled.
    pub async fn tests_completed_series(&self, window: SeriesWindow) -> Result<Vec<DailyStats>> {
        let today = Utc::now().date_naive();
        let from = window.first_day(today)?;
        let rows = self.store.daily_stats(from, today).await?;
        let start =
            from.unwrap_or_else(|| history_start(rows.first().map(|r| r.stat_date), today));
        Ok(zero_fill(&rows, start, today))
    }

    /// Users per day of their latest activity over `window`. An all-time
    /// series starts at the first signup.
    pub async fn active_users_series(
        &self,
        window: SeriesWindow,
    ) -> Result<Vec<DailyActiveUsers>> {
        let today = Utc::now().date_naive();
        let from = window.first_day(today)?;
        let rows = self.store.active_users_by_day(from, today).await?;
        let start = match from {
            Some(day) => day,
            None => history_start(self.store.first_signup_date().await?, today),
        };
        Ok(zero_fill_active(&rows, start, today))
    }

    /// Newest completed sessions, optionally narrowed to one user or to the
    /// test set `test_id` belongs to.
    pub async fn results(
        &self,
        user_id: Option<Uuid>,
        test_id: Option<Uuid>,
    ) -> Result<Vec<CompletedResult>> {
        let module_ids = match test_id {
            Some(id) => Some(self.set_module_ids(id).await?),
            None => None,
        };
        let filter = ResultFilter {
            user_id,
            module_ids,
        };
        self.store.list_results(&filter, RESULTS_LIMIT).await
    }

    async fn set_module_ids(&self, id: Uuid) -> Result<Vec<Uuid>> {
        let Some(row) = self.store.get_test_content(id).await? else {
            return Ok(vec![id]);
        };
        let key = row.title_key();
        Ok(self
            .store
            .list_test_contents(&ModuleFilter::default())
            .await?
            .into_iter()
            .filter(|c| match row.test_set_id {
                Some(set_id) => c.test_set_id == Some(set_id),
                None => c.title_key() == key,
            })
            .map(|c| c.id)
            .collect())
    }

    pub async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>> {
        let users = self
            .store
            .top_users_by_best_score(limit.clamp(1, 100))
            .await?;
        Ok(users
            .into_iter()
            .map(|u| LeaderboardEntry {
                user_id: u.id,
                username: u.username,
                best_score: u.best_score,
                tests_completed: u.tests_completed,
            })
            .collect())
    }

    pub async fn progress(&self, user_id: Uuid) -> Result<ProgressView> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
        let sessions = self
            .store
            .list_completed_sessions(user_id, RECENT_SESSIONS)
            .await?;
        let average_score = if sessions.is_empty() {
            0
        } else {
            sessions.iter().map(|s| s.total_score).sum::<i32>() / sessions.len() as i32
        };
        let recent = sessions
            .into_iter()
            .map(|s| SessionSummary {
                session_id: s.id,
                english_score: s.english_score,
                math_score: s.math_score,
                total_score: s.total_score,
                certificate_id: s.certificate_id,
                completed_at: s.completed_at,
            })
            .collect();
        Ok(ProgressView {
            tests_completed: user.tests_completed,
            best_score: user.best_score,
            target_score: user.target_score,
            average_score,
            total_time_spent_minutes: user.total_time_spent,
            recent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory_store::InMemoryExamStore;
    use crate::models::user::{SubscriptionTier, User};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
    }

    #[test]
    fn zero_fill_covers_every_day() {
        let rows = vec![
            DailyStats {
                stat_date: day(2),
                tests_completed: 4,
            },
            DailyStats {
                stat_date: day(4),
                tests_completed: 1,
            },
        ];
        let series = zero_fill(&rows, day(1), day(5));
        let counts: Vec<i32> = series.iter().map(|d| d.tests_completed).collect();
        assert_eq!(counts, vec![0, 4, 0, 1, 0]);
        assert!(zero_fill(&rows, day(5), day(1)).is_empty());
    }

    #[tokio::test]
    async fn series_ends_today_with_requested_length() {
        let stats = StatsService::new(Arc::new(InMemoryExamStore::new()));
        let week = stats
            .tests_completed_series(SeriesWindow::default())
            .await
            .unwrap();
        assert_eq!(week.len(), 7);
        assert_eq!(week.last().unwrap().stat_date, Utc::now().date_naive());
        // Nothing recorded yet: the all-time chart covers the last 30 days.
        let all = stats.tests_completed_series(SeriesWindow::All).await.unwrap();
        assert_eq!(all.len(), 31);
    }

    #[test]
    fn parses_series_windows() {
        assert_eq!("all".parse::<SeriesWindow>().unwrap(), SeriesWindow::All);
        assert_eq!(" ALL ".parse::<SeriesWindow>().unwrap(), SeriesWindow::All);
        assert_eq!("30".parse::<SeriesWindow>().unwrap(), SeriesWindow::LastDays(30));
        assert_eq!(
            "4000000000".parse::<SeriesWindow>().unwrap(),
            SeriesWindow::LastDays(MAX_SERIES_DAYS)
        );
        assert!("0".parse::<SeriesWindow>().is_err());
        assert!("-3".parse::<SeriesWindow>().is_err());
        assert!("week".parse::<SeriesWindow>().is_err());
    }

    #[tokio::test]
    async fn huge_day_count_is_capped_instead_of_overflowing() {
        let stats = StatsService::new(Arc::new(InMemoryExamStore::new()));
        let series = stats
            .tests_completed_series(SeriesWindow::LastDays(4_000_000_000))
            .await
            .unwrap();
        assert_eq!(series.len(), MAX_SERIES_DAYS as usize);
        let active = stats
            .active_users_series(SeriesWindow::LastDays(u32::MAX))
            .await
            .unwrap();
        assert_eq!(active.len(), MAX_SERIES_DAYS as usize);
    }

    #[tokio::test]
    async fn dashboard_counts_signups_and_daily_actives() {
        let store = Arc::new(InMemoryExamStore::new());
        let now = Utc::now();
        let mut veteran = User::new("veteran", "veteran@satly.uz", SubscriptionTier::Free);
        veteran.created_at = now - Duration::days(20);
        veteran.last_active = now - Duration::days(3);
        store.insert_user(&veteran).await.unwrap();
        store
            .insert_user(&User::new("fresh", "fresh@satly.uz", SubscriptionTier::Free))
            .await
            .unwrap();

        let stats = StatsService::new(store);
        let dashboard = stats.dashboard().await.unwrap();
        assert_eq!(dashboard.total_users, 2);
        assert_eq!(dashboard.new_signups, 1);
        assert_eq!(dashboard.dau, 1);

        let week = stats
            .active_users_series(SeriesWindow::default())
            .await
            .unwrap();
        let counts: Vec<i64> = week.iter().map(|d| d.active_users).collect();
        assert_eq!(counts, vec![0, 0, 0, 1, 0, 0, 1]);

        let all = stats.active_users_series(SeriesWindow::All).await.unwrap();
        assert_eq!(all.len(), 21);
        assert_eq!(all[0].stat_date, veteran.created_at.date_naive());
    }

    #[tokio::test]
    async fn leaderboard_skips_users_without_scores() {
        let store = Arc::new(InMemoryExamStore::new());
        let mut top = User::new("top", "top@satly.uz", SubscriptionTier::Free);
        top.best_score = 1510;
        let mut mid = User::new("mid", "mid@satly.uz", SubscriptionTier::Free);
        mid.best_score = 1200;
        store.insert_user(&mid).await.unwrap();
        store.insert_user(&top).await.unwrap();
        store
            .insert_user(&User::new("new", "new@satly.uz", SubscriptionTier::Free))
            .await
            .unwrap();

        let board = StatsService::new(store).leaderboard(10).await.unwrap();
        let names: Vec<&str> = board.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, vec!["top", "mid"]);
    }
}
