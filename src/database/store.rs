use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::Result;
use crate::models::audit_log::AuditLog;
use crate::models::daily_stats::{DailyActiveUsers, DailyStats};
use crate::models::exam_answer::{ExamAnswer, NewAnswer};
use crate::models::exam_session::{
    CompletedResult, ExamSession, SessionChange, SessionGuard,
};
use crate::models::payment::{Payment, PaymentStatus, PaymentSummary, PricingSettings};
use crate::models::test_content::{ModuleKind, Section, TestContent};
use crate::models::user::{SubscriptionTier, User};

/// How a module row is located among the active rows of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleLookup {
    /// Rows sharing an explicit `test_set_id`.
    InSet(Uuid),
    /// Title equal byte for byte.
    ExactTitle(String),
    /// Title equal after trimming, ignoring case.
    TitleIgnoreCase(String),
    /// Title containing the fragment, ignoring case.
    TitleContains(String),
    /// Any active row.
    Latest,
}

#[derive(Debug, Clone, Default)]
pub struct ModuleFilter {
    pub kind: Option<ModuleKind>,
    pub is_active: Option<bool>,
}

/// Narrows the admin results list. `module_ids` matches the module a
/// session ended on.
#[derive(Debug, Clone, Default)]
pub struct ResultFilter {
    pub user_id: Option<Uuid>,
    pub module_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone)]
pub enum SessionCreated {
    Created(ExamSession),
    /// Another request created the user's live session first.
    Existing(ExamSession),
}

impl SessionCreated {
    pub fn into_session(self) -> ExamSession {
        match self {
            SessionCreated::Created(s) | SessionCreated::Existing(s) => s,
        }
    }
}

/// Persistence contract behind every service.
///
/// Each method is one short transaction. Lookups that can legitimately miss
/// return `Option`; `Err` is reserved for storage failures.
#[async_trait]
pub trait ExamStore: Send + Sync {
    // users
    async fn insert_user(&self, user: &User) -> Result<User>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn set_subscription(&self, id: Uuid, tier: SubscriptionTier) -> Result<()>;
    async fn count_users(&self) -> Result<i64>;
    /// Users whose signup date (UTC) is on or after `day`.
    async fn count_users_created_since(&self, day: NaiveDate) -> Result<i64>;
    async fn first_signup_date(&self) -> Result<Option<NaiveDate>>;
    /// Users grouped by the UTC date of `last_active` in `[from, to]`,
    /// oldest first. Days without activity have no row.
    async fn active_users_by_day(
        &self,
        from: Option<NaiveDate>,
        to: NaiveDate,
    ) -> Result<Vec<DailyActiveUsers>>;
    /// Users with a recorded score, best first.
    async fn top_users_by_best_score(&self, limit: i64) -> Result<Vec<User>>;

    // catalog
    async fn list_test_contents(&self, filter: &ModuleFilter) -> Result<Vec<TestContent>>;
    async fn get_test_content(&self, id: Uuid) -> Result<Option<TestContent>>;
    /// Newest active row of `kind` matching `lookup`.
    async fn find_active_module(
        &self,
        kind: ModuleKind,
        lookup: &ModuleLookup,
    ) -> Result<Option<TestContent>>;
    /// Newest row of `kind` whose trimmed title equals `title` ignoring case,
    /// active or not.
    async fn find_content_by_title(
        &self,
        title: &str,
        kind: ModuleKind,
    ) -> Result<Option<TestContent>>;
    async fn insert_test_content(&self, content: &TestContent) -> Result<TestContent>;
    async fn update_test_content(&self, content: &TestContent) -> Result<Option<TestContent>>;
    async fn delete_test_content(&self, id: Uuid) -> Result<bool>;

    // sessions
    async fn find_live_session(&self, user_id: Uuid) -> Result<Option<ExamSession>>;
    async fn get_session(&self, id: Uuid) -> Result<Option<ExamSession>>;
    /// Inserts a new live session. With `credit`, the exam payment is marked
    /// consumed in the same transaction; a credit that was consumed meanwhile
    /// fails with `PaymentRequired` and nothing is written.
    async fn create_session(
        &self,
        session: &ExamSession,
        credit: Option<Uuid>,
    ) -> Result<SessionCreated>;
    async fn delete_session(&self, id: Uuid) -> Result<bool>;
    /// Overwrites `time_spent` while the session is live.
    async fn update_time_spent(&self, id: Uuid, seconds: i32) -> Result<bool>;
    /// Applies `change` only while the row still matches `guard`. When the
    /// change carries stats, the user counters and the day counter are bumped
    /// in the same transaction. `None` means the guard no longer held.
    async fn transition_session(
        &self,
        id: Uuid,
        guard: &SessionGuard,
        change: &SessionChange,
    ) -> Result<Option<ExamSession>>;
    async fn list_completed_sessions(&self, user_id: Uuid, limit: i64) -> Result<Vec<ExamSession>>;
    async fn count_completed_sessions(&self) -> Result<i64>;
    /// Completed sessions matching `filter`, newest first.
    async fn list_results(&self, filter: &ResultFilter, limit: i64)
        -> Result<Vec<CompletedResult>>;

    // answers
    async fn upsert_answer(&self, answer: &NewAnswer) -> Result<ExamAnswer>;
    async fn list_answers(
        &self,
        session_id: Uuid,
        section: Section,
        module_slot: i32,
    ) -> Result<Vec<ExamAnswer>>;
    async fn count_correct(&self, session_id: Uuid, section: Section, module_slot: i32)
        -> Result<i64>;

    // stats
    /// Stored day counters in `[from, to]`, oldest first. Days without
    /// completions have no row.
    async fn daily_stats(&self, from: Option<NaiveDate>, to: NaiveDate) -> Result<Vec<DailyStats>>;

    // payments
    async fn insert_payment(&self, payment: &Payment) -> Result<Payment>;
    async fn set_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Payment>>;
    /// Oldest completed, unconsumed exam payment of the user.
    async fn find_exam_credit(&self, user_id: Uuid) -> Result<Option<Payment>>;
    async fn list_payments(&self, limit: i64) -> Result<Vec<Payment>>;
    async fn payment_summary(&self) -> Result<PaymentSummary>;
    async fn get_pricing(&self) -> Result<PricingSettings>;
    async fn update_pricing(&self, exam_price: Decimal, subscription_price: Decimal)
        -> Result<PricingSettings>;

    // audit
    async fn insert_audit_log(&self, log: &AuditLog) -> Result<AuditLog>;
}
