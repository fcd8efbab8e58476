use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::store::{ExamStore, ModuleFilter, ModuleLookup, ResultFilter, SessionCreated};
use crate::error::{Error, Result};
use crate::models::audit_log::AuditLog;
use crate::models::daily_stats::{DailyActiveUsers, DailyStats};
use crate::models::exam_answer::{ExamAnswer, NewAnswer};
use crate::models::exam_session::{
    CompletedResult, ExamSession, SessionChange, SessionGuard, SessionStatus,
};
use crate::models::payment::{
    Payment, PaymentStatus, PaymentSummary, PaymentType, PricingSettings,
};
use crate::models::test_content::{ModuleKind, Section, TestContent};
use crate::models::user::{SubscriptionTier, User};

type AnswerKey = (Uuid, Section, i32, i32);

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    contents: HashMap<Uuid, TestContent>,
    sessions: HashMap<Uuid, ExamSession>,
    answers: HashMap<AnswerKey, ExamAnswer>,
    daily: HashMap<NaiveDate, i32>,
    payments: HashMap<Uuid, Payment>,
    pricing: Option<PricingSettings>,
    audit: Vec<AuditLog>,
}

/// Process-local store used by tests and local runs without Postgres.
///
/// A single mutex over all tables gives every method the same all-or-nothing
/// behaviour as the Postgres transactions.
#[derive(Clone, Default)]
pub struct InMemoryExamStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryExamStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| Error::Internal(format!("memory store poisoned: {e}")))
    }

    /// Number of stored answers for a session, across all modules.
    pub fn answer_count(&self, session_id: Uuid) -> usize {
        self.lock()
            .map(|s| s.answers.keys().filter(|k| k.0 == session_id).count())
            .unwrap_or(0)
    }

    pub fn audit_entries(&self) -> Vec<AuditLog> {
        self.lock().map(|s| s.audit.clone()).unwrap_or_default()
    }
}

fn newest<'a>(rows: impl Iterator<Item = &'a TestContent>) -> Option<TestContent> {
    rows.max_by_key(|c| c.created_at).cloned()
}

fn matches_lookup(content: &TestContent, lookup: &ModuleLookup) -> bool {
    match lookup {
        ModuleLookup::InSet(set_id) => content.test_set_id == Some(*set_id),
        ModuleLookup::ExactTitle(title) => content.title == *title,
        ModuleLookup::TitleIgnoreCase(title) => content.title_key() == title.trim().to_lowercase(),
        ModuleLookup::TitleContains(fragment) => content
            .title
            .to_lowercase()
            .contains(&fragment.to_lowercase()),
        ModuleLookup::Latest => true,
    }
}

#[async_trait]
impl ExamStore for InMemoryExamStore {
    async fn insert_user(&self, user: &User) -> Result<User> {
        let mut state = self.lock()?;
        if state.users.values().any(|u| u.username == user.username) {
            return Err(Error::BadRequest(format!(
                "Username {} is taken",
                user.username
            )));
        }
        state.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn set_subscription(&self, id: Uuid, tier: SubscriptionTier) -> Result<()> {
        let mut state = self.lock()?;
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
        user.subscription = tier;
        Ok(())
    }

    async fn count_users(&self) -> Result<i64> {
        Ok(self.lock()?.users.len() as i64)
    }

    async fn count_users_created_since(&self, day: NaiveDate) -> Result<i64> {
        let state = self.lock()?;
        Ok(state
            .users
            .values()
            .filter(|u| u.created_at.date_naive() >= day)
            .count() as i64)
    }

    async fn first_signup_date(&self) -> Result<Option<NaiveDate>> {
        let state = self.lock()?;
        Ok(state.users.values().map(|u| u.created_at.date_naive()).min())
    }

    async fn active_users_by_day(
        &self,
        from: Option<NaiveDate>,
        to: NaiveDate,
    ) -> Result<Vec<DailyActiveUsers>> {
        let state = self.lock()?;
        let mut counts: HashMap<NaiveDate, i64> = HashMap::new();
        for user in state.users.values() {
            let day = user.last_active.date_naive();
            if from.map_or(true, |f| day >= f) && day <= to {
                *counts.entry(day).or_insert(0) += 1;
            }
        }
        let mut rows: Vec<DailyActiveUsers> = counts
            .into_iter()
            .map(|(stat_date, active_users)| DailyActiveUsers {
                stat_date,
                active_users,
            })
            .collect();
        rows.sort_by_key(|d| d.stat_date);
        Ok(rows)
    }

    async fn top_users_by_best_score(&self, limit: i64) -> Result<Vec<User>> {
        let state = self.lock()?;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| u.best_score > 0)
            .cloned()
            .collect();
        users.sort_by(|a, b| {
            b.best_score
                .cmp(&a.best_score)
                .then_with(|| a.username.cmp(&b.username))
        });
        users.truncate(limit.max(0) as usize);
        Ok(users)
    }

    async fn list_test_contents(&self, filter: &ModuleFilter) -> Result<Vec<TestContent>> {
        let state = self.lock()?;
        let mut rows: Vec<TestContent> = state
            .contents
            .values()
            .filter(|c| filter.kind.map_or(true, |k| c.module_kind == k))
            .filter(|c| filter.is_active.map_or(true, |a| c.is_active == a))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn get_test_content(&self, id: Uuid) -> Result<Option<TestContent>> {
        Ok(self.lock()?.contents.get(&id).cloned())
    }

    async fn find_active_module(
        &self,
        kind: ModuleKind,
        lookup: &ModuleLookup,
    ) -> Result<Option<TestContent>> {
        let state = self.lock()?;
        Ok(newest(state.contents.values().filter(|c| {
            c.is_active && c.module_kind == kind && matches_lookup(c, lookup)
        })))
    }

    async fn find_content_by_title(
        &self,
        title: &str,
        kind: ModuleKind,
    ) -> Result<Option<TestContent>> {
        let key = title.trim().to_lowercase();
        let state = self.lock()?;
        Ok(newest(
            state
                .contents
                .values()
                .filter(|c| c.module_kind == kind && c.title_key() == key),
        ))
    }

    async fn insert_test_content(&self, content: &TestContent) -> Result<TestContent> {
        self.lock()?.contents.insert(content.id, content.clone());
        Ok(content.clone())
    }

    async fn update_test_content(&self, content: &TestContent) -> Result<Option<TestContent>> {
        let mut state = self.lock()?;
        match state.contents.get_mut(&content.id) {
            Some(row) => {
                let created_at = row.created_at;
                *row = content.clone();
                row.created_at = created_at;
                row.updated_at = Utc::now();
                Ok(Some(row.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_test_content(&self, id: Uuid) -> Result<bool> {
        let mut state = self.lock()?;
        if state.contents.remove(&id).is_none() {
            return Ok(false);
        }
        for session in state.sessions.values_mut() {
            if session.test_content_id == Some(id) {
                session.test_content_id = None;
            }
        }
        Ok(true)
    }

    async fn find_live_session(&self, user_id: Uuid) -> Result<Option<ExamSession>> {
        let state = self.lock()?;
        Ok(state
            .sessions
            .values()
            .find(|s| s.user_id == user_id && s.status.is_live())
            .cloned())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<ExamSession>> {
        Ok(self.lock()?.sessions.get(&id).cloned())
    }

    async fn create_session(
        &self,
        session: &ExamSession,
        credit: Option<Uuid>,
    ) -> Result<SessionCreated> {
        let mut state = self.lock()?;
        if let Some(existing) = state
            .sessions
            .values()
            .find(|s| s.user_id == session.user_id && s.status.is_live())
        {
            return Ok(SessionCreated::Existing(existing.clone()));
        }
        if let Some(payment_id) = credit {
            let payment = state
                .payments
                .get_mut(&payment_id)
                .filter(|p| p.is_exam_credit())
                .ok_or_else(|| Error::PaymentRequired("Exam payment was already used".to_string()))?;
            payment.consumed_session_id = Some(session.id);
        }
        state.sessions.insert(session.id, session.clone());
        Ok(SessionCreated::Created(session.clone()))
    }

    async fn delete_session(&self, id: Uuid) -> Result<bool> {
        let mut state = self.lock()?;
        if state.sessions.remove(&id).is_none() {
            return Ok(false);
        }
        state.answers.retain(|key, _| key.0 != id);
        for payment in state.payments.values_mut() {
            if payment.consumed_session_id == Some(id) {
                payment.consumed_session_id = None;
            }
        }
        Ok(true)
    }

    async fn update_time_spent(&self, id: Uuid, seconds: i32) -> Result<bool> {
        let mut state = self.lock()?;
        match state.sessions.get_mut(&id) {
            Some(session) if session.status.is_live() => {
                session.time_spent = seconds;
                session.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn transition_session(
        &self,
        id: Uuid,
        guard: &SessionGuard,
        change: &SessionChange,
    ) -> Result<Option<ExamSession>> {
        let mut state = self.lock()?;
        let now = Utc::now();
        let updated = match state.sessions.get_mut(&id) {
            Some(session) if guard.matches(session) => {
                change.apply_to(session, now);
                session.clone()
            }
            _ => return Ok(None),
        };

        if let Some(stats) = &change.stats {
            if let Some(user) = state.users.get_mut(&stats.user_id) {
                user.tests_completed += 1;
                user.best_score = user.best_score.max(stats.total_score);
                user.total_time_spent += stats.elapsed_minutes;
                user.last_active = now;
            }
            *state.daily.entry(stats.day).or_insert(0) += 1;
        }

        Ok(Some(updated))
    }

    async fn list_completed_sessions(&self, user_id: Uuid, limit: i64) -> Result<Vec<ExamSession>> {
        let state = self.lock()?;
        let mut rows: Vec<ExamSession> = state
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && s.status == SessionStatus::Completed)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn count_completed_sessions(&self) -> Result<i64> {
        let state = self.lock()?;
        Ok(state
            .sessions
            .values()
            .filter(|s| s.status == SessionStatus::Completed)
            .count() as i64)
    }

    async fn list_results(
        &self,
        filter: &ResultFilter,
        limit: i64,
    ) -> Result<Vec<CompletedResult>> {
        let state = self.lock()?;
        let mut rows: Vec<CompletedResult> = state
            .sessions
            .values()
            .filter(|s| s.status == SessionStatus::Completed)
            .filter(|s| filter.user_id.map_or(true, |id| s.user_id == id))
            .filter(|s| match (&filter.module_ids, s.test_content_id) {
                (None, _) => true,
                (Some(ids), Some(module)) => ids.contains(&module),
                (Some(_), None) => false,
            })
            .filter_map(|s| {
                let user = state.users.get(&s.user_id)?;
                let title = s
                    .test_content_id
                    .and_then(|id| state.contents.get(&id))
                    .map(|c| c.title.clone());
                Some(CompletedResult {
                    session_id: s.id,
                    user_id: s.user_id,
                    username: user.username.clone(),
                    email: user.email.clone(),
                    test_content_id: s.test_content_id,
                    test_title: title,
                    english_score: s.english_score,
                    math_score: s.math_score,
                    total_score: s.total_score,
                    time_spent: s.time_spent,
                    certificate_id: s.certificate_id.clone(),
                    completed_at: s.completed_at,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn upsert_answer(&self, answer: &NewAnswer) -> Result<ExamAnswer> {
        let mut state = self.lock()?;
        let key = (
            answer.session_id,
            answer.section,
            answer.module_slot,
            answer.question_index,
        );
        let now = Utc::now();
        let row = state.answers.entry(key).or_insert_with(|| ExamAnswer {
            id: Uuid::new_v4(),
            session_id: answer.session_id,
            section: answer.section,
            module_slot: answer.module_slot,
            question_index: answer.question_index,
            selected_answer: None,
            is_correct: false,
            answered_at: now,
        });
        row.selected_answer = Some(answer.selected_answer.clone());
        row.is_correct = answer.is_correct;
        row.answered_at = now;
        Ok(row.clone())
    }

    async fn list_answers(
        &self,
        session_id: Uuid,
        section: Section,
        module_slot: i32,
    ) -> Result<Vec<ExamAnswer>> {
        let state = self.lock()?;
        let mut rows: Vec<ExamAnswer> = state
            .answers
            .values()
            .filter(|a| {
                a.session_id == session_id && a.section == section && a.module_slot == module_slot
            })
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.question_index);
        Ok(rows)
    }

    async fn count_correct(
        &self,
        session_id: Uuid,
        section: Section,
        module_slot: i32,
    ) -> Result<i64> {
        let state = self.lock()?;
        Ok(state
            .answers
            .values()
            .filter(|a| {
                a.session_id == session_id
                    && a.section == section
                    && a.module_slot == module_slot
                    && a.is_correct
            })
            .count() as i64)
    }

    async fn daily_stats(&self, from: Option<NaiveDate>, to: NaiveDate) -> Result<Vec<DailyStats>> {
        let state = self.lock()?;
        let mut rows: Vec<DailyStats> = state
            .daily
            .iter()
            .filter(|(day, _)| from.map_or(true, |f| **day >= f) && **day <= to)
            .map(|(day, count)| DailyStats {
                stat_date: *day,
                tests_completed: *count,
            })
            .collect();
        rows.sort_by_key(|d| d.stat_date);
        Ok(rows)
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<Payment> {
        let mut state = self.lock()?;
        if state
            .payments
            .values()
            .any(|p| p.transaction_id == payment.transaction_id)
        {
            return Err(Error::BadRequest("Duplicate transaction id".to_string()));
        }
        state.payments.insert(payment.id, payment.clone());
        Ok(payment.clone())
    }

    async fn set_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Payment>> {
        let mut state = self.lock()?;
        Ok(state.payments.get_mut(&id).map(|payment| {
            payment.status = status;
            payment.completed_at = completed_at.or(payment.completed_at);
            payment.clone()
        }))
    }

    async fn find_exam_credit(&self, user_id: Uuid) -> Result<Option<Payment>> {
        let state = self.lock()?;
        Ok(state
            .payments
            .values()
            .filter(|p| p.user_id == user_id && p.is_exam_credit())
            .min_by_key(|p| p.created_at)
            .cloned())
    }

    async fn list_payments(&self, limit: i64) -> Result<Vec<Payment>> {
        let state = self.lock()?;
        let mut rows: Vec<Payment> = state.payments.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn payment_summary(&self) -> Result<PaymentSummary> {
        let state = self.lock()?;
        let completed = state
            .payments
            .values()
            .filter(|p| p.status == PaymentStatus::Completed);
        let mut summary = PaymentSummary::default();
        for payment in completed {
            summary.total_revenue += payment.amount;
            match payment.payment_type {
                PaymentType::Exam => summary.exam_count += 1,
                PaymentType::Subscription => summary.subscription_count += 1,
            }
        }
        Ok(summary)
    }

    async fn get_pricing(&self) -> Result<PricingSettings> {
        Ok(self.lock()?.pricing.clone().unwrap_or_default())
    }

    async fn update_pricing(
        &self,
        exam_price: Decimal,
        subscription_price: Decimal,
    ) -> Result<PricingSettings> {
        let settings = PricingSettings {
            exam_price,
            subscription_price,
            updated_at: Utc::now(),
        };
        self.lock()?.pricing = Some(settings.clone());
        Ok(settings)
    }

    async fn insert_audit_log(&self, log: &AuditLog) -> Result<AuditLog> {
        self.lock()?.audit.push(log.clone());
        Ok(log.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::exam_session::StatsDelta;
    use crate::models::test_content::Section;

    fn live_session(user_id: Uuid) -> ExamSession {
        ExamSession::new(user_id, Uuid::new_v4(), Section::English, Utc::now())
    }

    #[tokio::test]
    async fn second_live_session_resolves_to_existing() {
        let store = InMemoryExamStore::new();
        let user = Uuid::new_v4();
        let first = store
            .create_session(&live_session(user), None)
            .await
            .unwrap()
            .into_session();
        let second = store.create_session(&live_session(user), None).await.unwrap();
        assert!(matches!(second, SessionCreated::Existing(ref s) if s.id == first.id));
    }

    #[tokio::test]
    async fn stale_guard_leaves_row_untouched() {
        let store = InMemoryExamStore::new();
        let session = store
            .create_session(&live_session(Uuid::new_v4()), None)
            .await
            .unwrap()
            .into_session();
        let stale = SessionGuard {
            status: SessionStatus::Break,
            test_content_id: session.test_content_id,
        };
        let mut change = SessionChange::from_session(&session);
        change.status = SessionStatus::Abandoned;
        assert!(store
            .transition_session(session.id, &stale, &change)
            .await
            .unwrap()
            .is_none());
        let stored = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::InProgress);
    }

    #[tokio::test]
    async fn completion_stats_bump_user_and_day() {
        let store = InMemoryExamStore::new();
        let user = store
            .insert_user(&User::new("aziz", "aziz@satly.uz", SubscriptionTier::Premium))
            .await
            .unwrap();
        let session = store
            .create_session(&live_session(user.id), None)
            .await
            .unwrap()
            .into_session();
        let day = Utc::now().date_naive();
        let mut change = SessionChange::from_session(&session);
        change.status = SessionStatus::Completed;
        change.total_score = 1290;
        change.stats = Some(StatsDelta {
            user_id: user.id,
            total_score: 1290,
            elapsed_minutes: 95,
            day,
        });
        store
            .transition_session(session.id, &SessionGuard::of(&session), &change)
            .await
            .unwrap()
            .unwrap();

        let user = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.tests_completed, 1);
        assert_eq!(user.best_score, 1290);
        assert_eq!(user.total_time_spent, 95);
        let days = store.daily_stats(None, day).await.unwrap();
        assert_eq!(days, vec![DailyStats { stat_date: day, tests_completed: 1 }]);
    }
}
