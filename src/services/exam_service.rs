use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::config::DenominatorPolicy;
use crate::database::store::{ExamStore, SessionCreated};
use crate::error::{Error, Result};
use crate::models::exam_answer::ExamAnswer;
use crate::models::exam_session::{
    ExamSession, SessionChange, SessionGuard, SessionStatus, StatsDelta,
};
use crate::models::test_content::{ModuleKind, Section};
use crate::services::answer_service::{AnswerOutcome, AnswerService};
use crate::services::catalog_service::{CatalogService, ModuleContent};
use crate::services::scoring_service::{ExamResult, ScoringService};
use crate::utils::time::whole_minutes;
use crate::utils::token::certificate_id;

/// What the client should show after finishing a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    NextModule,
    Break,
    Results,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishPlan {
    pub change: SessionChange,
    pub action: NextAction,
}

/// Decides the transition out of the module being served.
///
/// `sibling` is the second module of the section when one exists with
/// questions; it is ignored when a second module was just finished.
pub fn plan_finish(
    session: &ExamSession,
    served: ModuleKind,
    correct: i32,
    total: i32,
    sibling: Option<Uuid>,
    scoring: &ScoringService,
    now: DateTime<Utc>,
) -> FinishPlan {
    let mut change = SessionChange::from_session(session);
    change.record_module(served, correct, total);

    let advance = match served {
        ModuleKind::EnglishModule1 | ModuleKind::MathModule1 => sibling,
        ModuleKind::EnglishModule2 | ModuleKind::MathModule2 => None,
    };
    if let Some(next_id) = advance {
        change.test_content_id = Some(next_id);
        change.current_module = 2;
        change.status = SessionStatus::InProgress;
        return FinishPlan {
            change,
            action: NextAction::NextModule,
        };
    }

    let mut preview = session.clone();
    change.apply_to(&mut preview, now);

    match served.section() {
        Section::English => {
            change.english_score = scoring.section_score(&preview, Section::English);
            change.status = SessionStatus::Break;
            if served == ModuleKind::EnglishModule2 {
                change.current_section = Section::Math;
            }
            FinishPlan {
                change,
                action: NextAction::Break,
            }
        }
        Section::Math => {
            change.math_score = scoring.section_score(&preview, Section::Math);
            change.total_score = change.english_score + change.math_score;
            change.status = SessionStatus::Completed;
            change.completed_at = Some(now);
            if session.certificate_id.is_none() {
                change.certificate_id = Some(certificate_id(now));
            }
            change.stats = Some(StatsDelta {
                user_id: session.user_id,
                total_score: change.total_score,
                elapsed_minutes: whole_minutes(session.time_spent),
                day: now.date_naive(),
            });
            FinishPlan {
                change,
                action: NextAction::Results,
            }
        }
    }
}

/// A session ready to be shown: the module being served and the answers
/// already recorded for it.
#[derive(Debug, Clone)]
pub struct ActiveExam {
    pub session: ExamSession,
    pub module: ModuleContent,
    pub restored: Vec<ExamAnswer>,
    pub resumed: bool,
}

impl ActiveExam {
    /// The timer is client-side; a fresh load always gets the full module.
    pub fn time_remaining_seconds(&self) -> i32 {
        self.module.content.duration_seconds
    }

    pub fn show_break(&self) -> bool {
        self.session.status == SessionStatus::Break
    }
}

#[derive(Clone)]
pub struct ExamService {
    store: Arc<dyn ExamStore>,
    catalog: CatalogService,
    answers: AnswerService,
    scoring: ScoringService,
}

impl ExamService {
    pub fn new(store: Arc<dyn ExamStore>, policy: DenominatorPolicy) -> Self {
        Self {
            catalog: CatalogService::new(store.clone()),
            answers: AnswerService::new(store.clone()),
            scoring: ScoringService::new(policy),
            store,
        }
    }

    /// Returns the user's live session, or starts a new one on the resolved
    /// entry module. New sessions for users without a premium plan consume
    /// one exam credit.
    pub async fn start_or_resume(&self, user_id: Uuid, test_id: Option<Uuid>) -> Result<ActiveExam> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

        if let Some(live) = self.store.find_live_session(user_id).await? {
            tracing::info!(session_id = %live.id, status = %live.status, "resuming exam session");
            return self.activate(live, true).await;
        }

        let entry = self
            .catalog
            .resolve_start_module(test_id)
            .await?
            .ok_or_else(|| Error::NotFound("No active test is available".to_string()))?;
        let module = ModuleContent::new(entry);
        if module.is_empty() {
            return Err(Error::MissingContent(format!(
                "{} has no questions",
                module.content.module_kind.display_name()
            )));
        }

        let credit = if user.subscription.skips_exam_payment() {
            None
        } else {
            let payment = self
                .store
                .find_exam_credit(user_id)
                .await?
                .ok_or_else(|| {
                    Error::PaymentRequired("Purchase an exam attempt to start".to_string())
                })?;
            Some(payment.id)
        };

        let kind = module.content.module_kind;
        let mut session = ExamSession::new(user_id, module.content.id, kind.section(), Utc::now());
        session.current_module = kind.slot();

        match self.store.create_session(&session, credit).await? {
            SessionCreated::Created(created) => {
                tracing::info!(
                    session_id = %created.id,
                    user_id = %user_id,
                    module_id = %module.content.id,
                    paid = credit.is_some(),
                    "exam session started"
                );
                Ok(ActiveExam {
                    session: created,
                    module,
                    restored: Vec::new(),
                    resumed: false,
                })
            }
            SessionCreated::Existing(existing) => {
                tracing::info!(session_id = %existing.id, "concurrent start resolved to live session");
                self.activate(existing, true).await
            }
        }
    }

    pub async fn record_answer(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        raw_index: &JsonValue,
        selected: &str,
    ) -> Result<AnswerOutcome> {
        let session = self.owned_session(user_id, session_id).await?;
        if session.status != SessionStatus::InProgress {
            return Err(Error::InvalidTransition(format!(
                "Answers are not accepted while the session is {}",
                session.status
            )));
        }
        let module = self.served_module(&session).await?;
        self.answers.record(&session, &module, raw_index, selected).await
    }

    /// Stores the client-reported elapsed time. `false` once the session has
    /// ended.
    pub async fn heartbeat(&self, user_id: Uuid, session_id: Uuid, elapsed_seconds: i32) -> Result<bool> {
        let session = self.owned_session(user_id, session_id).await?;
        if !session.status.is_live() {
            return Ok(false);
        }
        self.store
            .update_time_spent(session.id, elapsed_seconds.max(0))
            .await
    }

    /// Scores the module being served and moves the session on.
    pub async fn finish_section(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        module_id: Option<Uuid>,
    ) -> Result<NextAction> {
        let session = self.owned_session(user_id, session_id).await?;
        match session.status {
            SessionStatus::Completed => return Ok(NextAction::Results),
            SessionStatus::Break => return Ok(NextAction::Break),
            SessionStatus::Abandoned => {
                return Err(Error::InvalidTransition(
                    "Session was abandoned".to_string(),
                ))
            }
            SessionStatus::InProgress => {}
        }
        if let Some(requested) = module_id {
            if session.test_content_id != Some(requested) {
                return Err(Error::InvalidTransition(
                    "Module is no longer being served".to_string(),
                ));
            }
        }

        let module = self.served_module(&session).await?;
        let served = module.content.module_kind;
        let correct = self.answers.correct_count(&session, &module).await?;
        let sibling = match served {
            ModuleKind::EnglishModule1 => self
                .catalog
                .find_next_module(&module.content, ModuleKind::EnglishModule2)
                .await?
                .map(|c| c.id),
            ModuleKind::MathModule1 => self
                .catalog
                .find_next_module(&module.content, ModuleKind::MathModule2)
                .await?
                .map(|c| c.id),
            _ => None,
        };

        let plan = plan_finish(
            &session,
            served,
            correct,
            module.question_count(),
            sibling,
            &self.scoring,
            Utc::now(),
        );
        let updated = self
            .store
            .transition_session(session.id, &SessionGuard::of(&session), &plan.change)
            .await?
            .ok_or_else(|| Error::InvalidTransition("Session changed concurrently".to_string()))?;

        tracing::info!(
            session_id = %updated.id,
            module = %served,
            correct,
            total = module.question_count(),
            next_action = ?plan.action,
            status = %updated.status,
            "module finished"
        );
        if updated.status == SessionStatus::Completed {
            tracing::info!(
                session_id = %updated.id,
                english_score = updated.english_score,
                math_score = updated.math_score,
                total_score = updated.total_score,
                certificate_id = updated.certificate_id.as_deref().unwrap_or_default(),
                "exam completed"
            );
        }
        Ok(plan.action)
    }

    /// Moves a live session from an english module onto math module 1.
    pub async fn start_math(&self, user_id: Uuid, session_id: Uuid) -> Result<ExamSession> {
        let session = self.owned_session(user_id, session_id).await?;
        if !session.status.is_live() {
            return Err(Error::InvalidTransition(format!(
                "Cannot start math on a {} session",
                session.status
            )));
        }
        let served = self.served_module(&session).await?;
        if served.content.module_kind.section() != Section::English {
            return Err(Error::InvalidTransition(
                "Math section already started".to_string(),
            ));
        }
        let math = self
            .catalog
            .find_next_module(&served.content, ModuleKind::MathModule1)
            .await?
            .ok_or_else(|| Error::NotFound("Math module not found for this test".to_string()))?;

        let mut change = SessionChange::from_session(&session);
        change.current_section = Section::Math;
        change.current_module = 1;
        change.status = SessionStatus::InProgress;
        change.test_content_id = Some(math.id);

        let updated = self
            .store
            .transition_session(session.id, &SessionGuard::of(&session), &change)
            .await?
            .ok_or_else(|| Error::InvalidTransition("Session changed concurrently".to_string()))?;
        tracing::info!(session_id = %updated.id, module_id = %math.id, "math section started");
        Ok(updated)
    }

    pub async fn abandon(&self, user_id: Uuid, session_id: Uuid) -> Result<ExamSession> {
        let session = self.owned_session(user_id, session_id).await?;
        if !session.status.is_live() {
            return Err(Error::InvalidTransition(format!(
                "Cannot abandon a {} session",
                session.status
            )));
        }
        let mut change = SessionChange::from_session(&session);
        change.status = SessionStatus::Abandoned;
        let updated = self
            .store
            .transition_session(session.id, &SessionGuard::of(&session), &change)
            .await?
            .ok_or_else(|| Error::InvalidTransition("Session changed concurrently".to_string()))?;
        tracing::info!(session_id = %updated.id, "exam session abandoned");
        Ok(updated)
    }

    pub async fn result(&self, user_id: Uuid, session_id: Uuid) -> Result<ExamResult> {
        let session = self.owned_session(user_id, session_id).await?;
        if session.status != SessionStatus::Completed {
            return Err(Error::InvalidTransition(
                "Results are available once the exam is completed".to_string(),
            ));
        }
        Ok(self.scoring.result(&session))
    }

    /// Sessions of other users are reported as missing.
    pub async fn owned_session(&self, user_id: Uuid, session_id: Uuid) -> Result<ExamSession> {
        match self.store.get_session(session_id).await? {
            Some(session) if session.user_id == user_id => Ok(session),
            _ => Err(Error::NotFound("Exam session not found".to_string())),
        }
    }

    async fn activate(&self, session: ExamSession, resumed: bool) -> Result<ActiveExam> {
        let module = self.served_module(&session).await?;
        let restored = if session.status == SessionStatus::InProgress {
            self.answers.restore(&session, &module).await?
        } else {
            Vec::new()
        };
        Ok(ActiveExam {
            session,
            module,
            restored,
            resumed,
        })
    }

    /// Loads the module the session points at. A session whose module is gone
    /// or empty cannot progress, so it is deleted.
    async fn served_module(&self, session: &ExamSession) -> Result<ModuleContent> {
        let module = match session.test_content_id {
            Some(id) => self.catalog.load_module(id).await?,
            None => None,
        };
        match module {
            Some(module) if !module.is_empty() => Ok(module),
            _ => {
                self.store.delete_session(session.id).await?;
                tracing::warn!(
                    session_id = %session.id,
                    module_id = ?session.test_content_id,
                    "served module missing or empty, session deleted"
                );
                Err(Error::MissingContent(
                    "Test content for this session is no longer available".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory_store::InMemoryExamStore;
    use crate::models::payment::{Payment, PaymentMethod, PaymentStatus, PaymentType};
    use crate::models::test_content::{Difficulty, TestContent};
    use crate::models::user::{SubscriptionTier, User};
    use rust_decimal::Decimal;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    struct Fixture {
        store: Arc<InMemoryExamStore>,
        exams: ExamService,
        user: Uuid,
    }

    async fn fixture(tier: SubscriptionTier) -> Fixture {
        let store = Arc::new(InMemoryExamStore::new());
        let user = store
            .insert_user(&User::new("malika", "malika@satly.uz", tier))
            .await
            .unwrap();
        let exams = ExamService::new(store.clone(), DenominatorPolicy::QuestionCount);
        Fixture {
            store,
            exams,
            user: user.id,
        }
    }

    async fn add_module(store: &InMemoryExamStore, title: &str, kind: ModuleKind, count: usize) -> TestContent {
        let questions: Vec<_> = (0..count)
            .map(|i| json!({"text": format!("{kind} {i}"), "correct_answer": "A"}))
            .collect();
        let now = Utc::now();
        store
            .insert_test_content(&TestContent {
                id: Uuid::new_v4(),
                test_set_id: None,
                title: title.to_string(),
                description: String::new(),
                module_kind: kind,
                difficulty: Difficulty::Medium,
                duration_seconds: 1920,
                questions: json!(questions),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap()
    }

    async fn answer(f: &Fixture, session: Uuid, correct: usize, total: usize) {
        for i in 0..total {
            let label = if i < correct { "A" } else { "B" };
            let outcome = f
                .exams
                .record_answer(f.user, session, &json!(i), label)
                .await
                .unwrap();
            assert!(outcome.is_recorded());
        }
    }

    #[tokio::test]
    async fn english_without_second_module_goes_to_break() {
        let f = fixture(SubscriptionTier::Premium).await;
        add_module(&f.store, "Mock", ModuleKind::EnglishModule1, 27).await;
        let started = f.exams.start_or_resume(f.user, None).await.unwrap();
        assert_eq!(started.time_remaining_seconds(), 1920);
        let id = started.session.id;

        answer(&f, id, 20, 27).await;
        let action = f.exams.finish_section(f.user, id, None).await.unwrap();
        assert_eq!(action, NextAction::Break);

        let session = f.store.get_session(id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Break);
        assert_eq!(session.english_score, 644);
        assert_eq!(session.english_module1_score, 20);
        assert_eq!(session.english_module1_total, 27);
        assert!(session.certificate_id.is_none());

        let again = f.exams.finish_section(f.user, id, None).await.unwrap();
        assert_eq!(again, NextAction::Break);
    }

    #[tokio::test]
    async fn full_exam_completes_once() {
        let f = fixture(SubscriptionTier::Premium).await;
        add_module(&f.store, "Mock", ModuleKind::EnglishModule1, 27).await;
        add_module(&f.store, "Mock", ModuleKind::EnglishModule2, 27).await;
        add_module(&f.store, "Mock", ModuleKind::MathModule1, 22).await;
        add_module(&f.store, "Mock", ModuleKind::MathModule2, 22).await;

        let id = f.exams.start_or_resume(f.user, None).await.unwrap().session.id;
        answer(&f, id, 27, 27).await;
        assert_eq!(
            f.exams.finish_section(f.user, id, None).await.unwrap(),
            NextAction::NextModule
        );
        answer(&f, id, 27, 27).await;
        assert_eq!(
            f.exams.finish_section(f.user, id, None).await.unwrap(),
            NextAction::Break
        );
        let on_break = f.store.get_session(id).await.unwrap().unwrap();
        assert_eq!(on_break.english_score, 800);
        assert_eq!(on_break.current_section, Section::Math);

        assert_ok!(f.exams.start_math(f.user, id).await);
        answer(&f, id, 15, 22).await;
        assert_eq!(
            f.exams.finish_section(f.user, id, None).await.unwrap(),
            NextAction::NextModule
        );
        answer(&f, id, 18, 22).await;
        assert_eq!(
            f.exams.finish_section(f.user, id, None).await.unwrap(),
            NextAction::Results
        );

        let done = f.store.get_session(id).await.unwrap().unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
        assert_eq!(done.math_score, 650);
        assert_eq!(done.total_score, 1450);
        let cert = done.certificate_id.clone().unwrap();
        assert!(cert.starts_with(&format!("SATLY-{}-", Utc::now().format("%Y%m%d"))));
        assert_eq!(cert.len(), 23);

        assert_eq!(
            f.exams.finish_section(f.user, id, None).await.unwrap(),
            NextAction::Results
        );
        let user = f.store.get_user(f.user).await.unwrap().unwrap();
        assert_eq!(user.tests_completed, 1);
        assert_eq!(user.best_score, 1450);
        let after = f.store.get_session(id).await.unwrap().unwrap();
        assert_eq!(after.total_score, 1450);
        assert_eq!(after.certificate_id.as_deref(), Some(cert.as_str()));

        let result = f.exams.result(f.user, id).await.unwrap();
        assert_eq!((result.section_percentile, result.overall_percentile), (95, 94));
    }

    async fn run_short_exam(f: &Fixture, correct_per_module: usize) -> ExamSession {
        let id = f.exams.start_or_resume(f.user, None).await.unwrap().session.id;
        answer(f, id, correct_per_module, 4).await;
        assert_eq!(
            f.exams.finish_section(f.user, id, None).await.unwrap(),
            NextAction::Break
        );
        assert_ok!(f.exams.start_math(f.user, id).await);
        answer(f, id, correct_per_module, 4).await;
        assert_eq!(
            f.exams.finish_section(f.user, id, None).await.unwrap(),
            NextAction::Results
        );
        f.store.get_session(id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn lower_second_score_keeps_best() {
        let f = fixture(SubscriptionTier::Premium).await;
        add_module(&f.store, "Short", ModuleKind::EnglishModule1, 4).await;
        add_module(&f.store, "Short", ModuleKind::MathModule1, 4).await;

        let first = run_short_exam(&f, 4).await;
        assert_eq!(first.total_score, 1600);
        let second = run_short_exam(&f, 1).await;
        assert_ne!(first.id, second.id);
        assert_eq!(second.total_score, 700);

        let user = f.store.get_user(f.user).await.unwrap().unwrap();
        assert_eq!(user.best_score, 1600);
        assert_eq!(user.tests_completed, 2);
    }

    #[tokio::test]
    async fn heartbeat_keeps_last_value() {
        let f = fixture(SubscriptionTier::Premium).await;
        add_module(&f.store, "Mock", ModuleKind::EnglishModule1, 3).await;
        let id = f.exams.start_or_resume(f.user, None).await.unwrap().session.id;

        assert!(f.exams.heartbeat(f.user, id, 600).await.unwrap());
        assert!(f.exams.heartbeat(f.user, id, 120).await.unwrap());
        let session = f.store.get_session(id).await.unwrap().unwrap();
        assert_eq!(session.time_spent, 120);
    }

    #[tokio::test]
    async fn legacy_denominators_drive_section_score() {
        let f = fixture(SubscriptionTier::Premium).await;
        let legacy = ExamService::new(f.store.clone(), DenominatorPolicy::Legacy);
        add_module(&f.store, "Long", ModuleKind::EnglishModule1, 30).await;
        let id = legacy.start_or_resume(f.user, None).await.unwrap().session.id;
        for i in 0..30 {
            let label = if i < 20 { "A" } else { "B" };
            let outcome = legacy
                .record_answer(f.user, id, &json!(i), label)
                .await
                .unwrap();
            assert!(outcome.is_recorded());
        }

        assert_eq!(
            legacy.finish_section(f.user, id, None).await.unwrap(),
            NextAction::Break
        );
        let session = f.store.get_session(id).await.unwrap().unwrap();
        assert_eq!(session.english_module1_score, 20);
        assert_eq!(session.english_module1_total, 30);
        // Scaled against 27, not the 30 questions served; 30 would give 600.
        assert_eq!(session.english_score, 644);
    }

    #[tokio::test]
    async fn start_twice_resumes_same_session() {
        let f = fixture(SubscriptionTier::Premium).await;
        add_module(&f.store, "Mock", ModuleKind::EnglishModule1, 3).await;
        let first = f.exams.start_or_resume(f.user, None).await.unwrap();
        f.exams
            .record_answer(f.user, first.session.id, &json!(1), "A")
            .await
            .unwrap();
        let second = f.exams.start_or_resume(f.user, None).await.unwrap();
        assert_eq!(first.session.id, second.session.id);
        assert!(second.resumed);
        assert_eq!(second.restored.len(), 1);
    }

    #[tokio::test]
    async fn free_user_needs_an_unused_exam_credit() {
        let f = fixture(SubscriptionTier::Enterprise).await;
        add_module(&f.store, "Mock", ModuleKind::EnglishModule1, 3).await;
        let err = f.exams.start_or_resume(f.user, None).await.unwrap_err();
        assert!(matches!(err, Error::PaymentRequired(_)));

        let now = Utc::now();
        f.store
            .insert_payment(&Payment {
                id: Uuid::new_v4(),
                user_id: f.user,
                payment_method: PaymentMethod::Click,
                amount: Decimal::new(1999900, 2),
                status: PaymentStatus::Completed,
                card_last4: None,
                card_expiry: None,
                transaction_id: "PAY-20260101000000-ABCDEFGH".to_string(),
                payment_type: PaymentType::Exam,
                consumed_session_id: None,
                created_at: now,
                completed_at: Some(now),
            })
            .await
            .unwrap();
        let started = f.exams.start_or_resume(f.user, None).await.unwrap();
        assert!(f.store.find_exam_credit(f.user).await.unwrap().is_none());

        f.exams.abandon(f.user, started.session.id).await.unwrap();
        assert_err!(f.exams.start_or_resume(f.user, None).await);
    }

    #[tokio::test]
    async fn stale_or_terminal_finish_is_rejected() {
        let f = fixture(SubscriptionTier::Premium).await;
        add_module(&f.store, "Mock", ModuleKind::EnglishModule1, 3).await;
        let id = f.exams.start_or_resume(f.user, None).await.unwrap().session.id;

        let stale = f
            .exams
            .finish_section(f.user, id, Some(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(stale, Error::InvalidTransition(_)));

        f.exams.abandon(f.user, id).await.unwrap();
        let abandoned = f.exams.finish_section(f.user, id, None).await.unwrap_err();
        assert!(matches!(abandoned, Error::InvalidTransition(_)));
        assert!(!f.exams.heartbeat(f.user, id, 300).await.unwrap());
    }

    #[tokio::test]
    async fn start_math_without_math_module_changes_nothing() {
        let f = fixture(SubscriptionTier::Premium).await;
        add_module(&f.store, "Mock", ModuleKind::EnglishModule1, 2).await;
        let id = f.exams.start_or_resume(f.user, None).await.unwrap().session.id;
        f.exams.finish_section(f.user, id, None).await.unwrap();

        let err = f.exams.start_math(f.user, id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        let session = f.store.get_session(id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Break);
        assert_eq!(session.current_section, Section::English);
    }

    #[tokio::test]
    async fn deleted_module_removes_the_session() {
        let f = fixture(SubscriptionTier::Premium).await;
        let module = add_module(&f.store, "Mock", ModuleKind::EnglishModule1, 2).await;
        let id = f.exams.start_or_resume(f.user, None).await.unwrap().session.id;
        f.store.delete_test_content(module.id).await.unwrap();

        let err = f.exams.finish_section(f.user, id, None).await.unwrap_err();
        assert!(matches!(err, Error::MissingContent(_)));
        assert!(f.store.get_session(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn other_users_sessions_are_not_found() {
        let f = fixture(SubscriptionTier::Premium).await;
        add_module(&f.store, "Mock", ModuleKind::EnglishModule1, 2).await;
        let id = f.exams.start_or_resume(f.user, None).await.unwrap().session.id;
        let err = f.exams.heartbeat(Uuid::new_v4(), id, 10).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(f.exams.heartbeat(f.user, id, 10).await.unwrap());
    }

    #[test]
    fn plan_keeps_existing_certificate() {
        let mut session = ExamSession::new(Uuid::new_v4(), Uuid::new_v4(), Section::Math, Utc::now());
        session.certificate_id = Some("SATLY-20260101-AAAAAAAA".to_string());
        let plan = plan_finish(
            &session,
            ModuleKind::MathModule1,
            10,
            22,
            None,
            &ScoringService::default(),
            Utc::now(),
        );
        assert_eq!(plan.action, NextAction::Results);
        assert_eq!(plan.change.certificate_id.as_deref(), Some("SATLY-20260101-AAAAAAAA"));
        assert_eq!(plan.change.math_score, 472);
    }
}
