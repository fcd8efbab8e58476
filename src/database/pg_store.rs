use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::store::{ExamStore, ModuleFilter, ModuleLookup, ResultFilter, SessionCreated};
use crate::error::{Error, Result};
use crate::models::audit_log::AuditLog;
use crate::models::daily_stats::{DailyActiveUsers, DailyStats};
use crate::models::exam_answer::{ExamAnswer, NewAnswer};
use crate::models::exam_session::{
    CompletedResult, ExamSession, SessionChange, SessionGuard,
};
use crate::models::payment::{Payment, PaymentStatus, PaymentSummary, PricingSettings};
use crate::models::test_content::{ModuleKind, Section, TestContent};
use crate::models::user::{SubscriptionTier, User};

const LIVE_SESSION_INDEX: &str = "uniq_exam_sessions_live_user";

#[derive(Clone)]
pub struct PgExamStore {
    pool: PgPool,
}

impl PgExamStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_live_session_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some("23505") && db.constraint() == Some(LIVE_SESSION_INDEX)
        }
        _ => false,
    }
}

/// Escapes LIKE wildcards so a title fragment only matches literally.
fn like_pattern(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    escaped.push('%');
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl ExamStore for PgExamStore {
    async fn insert_user(&self, user: &User) -> Result<User> {
        let row = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                id, username, email, subscription, best_score, target_score,
                tests_completed, total_time_spent, created_at, last_active
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.subscription.as_str())
        .bind(user.best_score)
        .bind(user.target_score)
        .bind(user.tests_completed)
        .bind(user.total_time_spent)
        .bind(user.created_at)
        .bind(user.last_active)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn set_subscription(&self, id: Uuid, tier: SubscriptionTier) -> Result<()> {
        let result = sqlx::query("UPDATE users SET subscription = $2 WHERE id = $1")
            .bind(id)
            .bind(tier.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    async fn count_users(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_users_created_since(&self, day: NaiveDate) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE (created_at AT TIME ZONE 'UTC')::date >= $1",
        )
        .bind(day)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn first_signup_date(&self) -> Result<Option<NaiveDate>> {
        let day: Option<NaiveDate> =
            sqlx::query_scalar("SELECT MIN((created_at AT TIME ZONE 'UTC')::date) FROM users")
                .fetch_one(&self.pool)
                .await?;
        Ok(day)
    }

    async fn active_users_by_day(
        &self,
        from: Option<NaiveDate>,
        to: NaiveDate,
    ) -> Result<Vec<DailyActiveUsers>> {
        let rows = sqlx::query_as::<_, DailyActiveUsers>(
            r#"
            SELECT (last_active AT TIME ZONE 'UTC')::date AS stat_date,
                   COUNT(*) AS active_users
            FROM users
            WHERE ($1::date IS NULL OR (last_active AT TIME ZONE 'UTC')::date >= $1)
              AND (last_active AT TIME ZONE 'UTC')::date <= $2
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn top_users_by_best_score(&self, limit: i64) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(
            r#"SELECT * FROM users WHERE best_score > 0
               ORDER BY best_score DESC, username ASC LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_test_contents(&self, filter: &ModuleFilter) -> Result<Vec<TestContent>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM test_contents WHERE TRUE");
        if let Some(kind) = filter.kind {
            builder.push(" AND module_kind = ");
            builder.push_bind(kind.as_str());
        }
        if let Some(active) = filter.is_active {
            builder.push(" AND is_active = ");
            builder.push_bind(active);
        }
        builder.push(" ORDER BY created_at DESC");
        let rows = builder
            .build_query_as::<TestContent>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_test_content(&self, id: Uuid) -> Result<Option<TestContent>> {
        let row = sqlx::query_as::<_, TestContent>("SELECT * FROM test_contents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_active_module(
        &self,
        kind: ModuleKind,
        lookup: &ModuleLookup,
    ) -> Result<Option<TestContent>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT * FROM test_contents WHERE is_active = TRUE AND module_kind = ",
        );
        builder.push_bind(kind.as_str());
        match lookup {
            ModuleLookup::InSet(set_id) => {
                builder.push(" AND test_set_id = ");
                builder.push_bind(*set_id);
            }
            ModuleLookup::ExactTitle(title) => {
                builder.push(" AND title = ");
                builder.push_bind(title.clone());
            }
            ModuleLookup::TitleIgnoreCase(title) => {
                builder.push(" AND lower(btrim(title)) = ");
                builder.push_bind(title.trim().to_lowercase());
            }
            ModuleLookup::TitleContains(fragment) => {
                builder.push(" AND title ILIKE ");
                builder.push_bind(like_pattern(fragment));
                builder.push(" ESCAPE '\\'");
            }
            ModuleLookup::Latest => {}
        }
        builder.push(" ORDER BY created_at DESC LIMIT 1");
        let row = builder
            .build_query_as::<TestContent>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_content_by_title(
        &self,
        title: &str,
        kind: ModuleKind,
    ) -> Result<Option<TestContent>> {
        let row = sqlx::query_as::<_, TestContent>(
            r#"SELECT * FROM test_contents
               WHERE lower(btrim(title)) = $1 AND module_kind = $2
               ORDER BY created_at DESC LIMIT 1"#,
        )
        .bind(title.trim().to_lowercase())
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_test_content(&self, content: &TestContent) -> Result<TestContent> {
        let row = sqlx::query_as::<_, TestContent>(
            r#"
            INSERT INTO test_contents (
                id, test_set_id, title, description, module_kind, difficulty,
                duration_seconds, questions, is_active, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(content.id)
        .bind(content.test_set_id)
        .bind(&content.title)
        .bind(&content.description)
        .bind(content.module_kind.as_str())
        .bind(content.difficulty.as_str())
        .bind(content.duration_seconds)
        .bind(&content.questions)
        .bind(content.is_active)
        .bind(content.created_at)
        .bind(content.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_test_content(&self, content: &TestContent) -> Result<Option<TestContent>> {
        let row = sqlx::query_as::<_, TestContent>(
            r#"
            UPDATE test_contents SET
                test_set_id = $2, title = $3, description = $4, module_kind = $5,
                difficulty = $6, duration_seconds = $7, questions = $8, is_active = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(content.id)
        .bind(content.test_set_id)
        .bind(&content.title)
        .bind(&content.description)
        .bind(content.module_kind.as_str())
        .bind(content.difficulty.as_str())
        .bind(content.duration_seconds)
        .bind(&content.questions)
        .bind(content.is_active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_test_content(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM test_contents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_live_session(&self, user_id: Uuid) -> Result<Option<ExamSession>> {
        let row = sqlx::query_as::<_, ExamSession>(
            r#"SELECT * FROM exam_sessions
               WHERE user_id = $1 AND status IN ('in_progress', 'break')
               ORDER BY started_at DESC LIMIT 1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<ExamSession>> {
        let row = sqlx::query_as::<_, ExamSession>("SELECT * FROM exam_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create_session(
        &self,
        session: &ExamSession,
        credit: Option<Uuid>,
    ) -> Result<SessionCreated> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, ExamSession>(
            r#"
            INSERT INTO exam_sessions (
                id, user_id, test_content_id, status, current_section, current_module,
                time_spent, started_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(session.test_content_id)
        .bind(session.status.as_str())
        .bind(session.current_section.as_str())
        .bind(session.current_module)
        .bind(session.time_spent)
        .bind(session.started_at)
        .bind(session.updated_at)
        .fetch_one(&mut *tx)
        .await;

        let created = match inserted {
            Ok(row) => row,
            Err(err) if is_live_session_conflict(&err) => {
                tx.rollback().await?;
                return match self.find_live_session(session.user_id).await? {
                    Some(existing) => Ok(SessionCreated::Existing(existing)),
                    None => Err(Error::InvalidTransition(
                        "Live session changed while starting, retry".to_string(),
                    )),
                };
            }
            Err(err) => return Err(err.into()),
        };

        if let Some(payment_id) = credit {
            let consumed = sqlx::query(
                r#"UPDATE payments SET consumed_session_id = $2
                   WHERE id = $1 AND consumed_session_id IS NULL
                     AND status = 'completed' AND payment_type = 'exam'"#,
            )
            .bind(payment_id)
            .bind(created.id)
            .execute(&mut *tx)
            .await?;
            if consumed.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(Error::PaymentRequired(
                    "Exam payment was already used".to_string(),
                ));
            }
        }

        tx.commit().await?;
        Ok(SessionCreated::Created(created))
    }

    async fn delete_session(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM exam_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_time_spent(&self, id: Uuid, seconds: i32) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE exam_sessions SET time_spent = $2, updated_at = NOW()
               WHERE id = $1 AND status IN ('in_progress', 'break')"#,
        )
        .bind(id)
        .bind(seconds)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn transition_session(
        &self,
        id: Uuid,
        guard: &SessionGuard,
        change: &SessionChange,
    ) -> Result<Option<ExamSession>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, ExamSession>(
            r#"
            UPDATE exam_sessions SET
                status = $4,
                current_section = $5,
                current_module = $6,
                test_content_id = $7,
                english_module1_score = $8,
                english_module2_score = $9,
                math_module1_score = $10,
                math_module2_score = $11,
                english_module1_total = $12,
                english_module2_total = $13,
                math_module1_total = $14,
                math_module2_total = $15,
                english_score = $16,
                math_score = $17,
                total_score = $18,
                completed_at = COALESCE(completed_at, $19),
                certificate_id = COALESCE(certificate_id, $20),
                updated_at = NOW()
            WHERE id = $1 AND status = $2 AND test_content_id IS NOT DISTINCT FROM $3
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(guard.status.as_str())
        .bind(guard.test_content_id)
        .bind(change.status.as_str())
        .bind(change.current_section.as_str())
        .bind(change.current_module)
        .bind(change.test_content_id)
        .bind(change.english_module1_score)
        .bind(change.english_module2_score)
        .bind(change.math_module1_score)
        .bind(change.math_module2_score)
        .bind(change.english_module1_total)
        .bind(change.english_module2_total)
        .bind(change.math_module1_total)
        .bind(change.math_module2_total)
        .bind(change.english_score)
        .bind(change.math_score)
        .bind(change.total_score)
        .bind(change.completed_at)
        .bind(change.certificate_id.as_deref())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(session) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(stats) = &change.stats {
            sqlx::query(
                r#"UPDATE users SET
                       tests_completed = tests_completed + 1,
                       best_score = GREATEST(best_score, $2),
                       total_time_spent = total_time_spent + $3,
                       last_active = NOW()
                   WHERE id = $1"#,
            )
            .bind(stats.user_id)
            .bind(stats.total_score)
            .bind(stats.elapsed_minutes)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"INSERT INTO daily_stats (stat_date, tests_completed) VALUES ($1, 1)
                   ON CONFLICT (stat_date)
                   DO UPDATE SET tests_completed = daily_stats.tests_completed + 1"#,
            )
            .bind(stats.day)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(session))
    }

    async fn list_completed_sessions(&self, user_id: Uuid, limit: i64) -> Result<Vec<ExamSession>> {
        let rows = sqlx::query_as::<_, ExamSession>(
            r#"SELECT * FROM exam_sessions
               WHERE user_id = $1 AND status = 'completed'
               ORDER BY completed_at DESC LIMIT $2"#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_completed_sessions(&self) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM exam_sessions WHERE status = 'completed'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn list_results(
        &self,
        filter: &ResultFilter,
        limit: i64,
    ) -> Result<Vec<CompletedResult>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"SELECT s.id AS session_id, s.user_id, u.username, u.email,
                      s.test_content_id, t.title AS test_title,
                      s.english_score, s.math_score, s.total_score, s.time_spent,
                      s.certificate_id, s.completed_at
               FROM exam_sessions s
               JOIN users u ON u.id = s.user_id
               LEFT JOIN test_contents t ON t.id = s.test_content_id
               WHERE s.status = 'completed'"#,
        );
        if let Some(user_id) = filter.user_id {
            builder.push(" AND s.user_id = ");
            builder.push_bind(user_id);
        }
        if let Some(ids) = &filter.module_ids {
            builder.push(" AND s.test_content_id = ANY(");
            builder.push_bind(ids.clone());
            builder.push(")");
        }
        builder.push(" ORDER BY s.completed_at DESC LIMIT ");
        builder.push_bind(limit);
        let rows = builder
            .build_query_as::<CompletedResult>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn upsert_answer(&self, answer: &NewAnswer) -> Result<ExamAnswer> {
        let row = sqlx::query_as::<_, ExamAnswer>(
            r#"
            INSERT INTO exam_answers (
                id, session_id, section, module_slot, question_index,
                selected_answer, is_correct, answered_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            ON CONFLICT (session_id, section, module_slot, question_index)
            DO UPDATE SET
                selected_answer = EXCLUDED.selected_answer,
                is_correct = EXCLUDED.is_correct,
                answered_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(answer.session_id)
        .bind(answer.section.as_str())
        .bind(answer.module_slot)
        .bind(answer.question_index)
        .bind(&answer.selected_answer)
        .bind(answer.is_correct)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_answers(
        &self,
        session_id: Uuid,
        section: Section,
        module_slot: i32,
    ) -> Result<Vec<ExamAnswer>> {
        let rows = sqlx::query_as::<_, ExamAnswer>(
            r#"SELECT * FROM exam_answers
               WHERE session_id = $1 AND section = $2 AND module_slot = $3
               ORDER BY question_index"#,
        )
        .bind(session_id)
        .bind(section.as_str())
        .bind(module_slot)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_correct(
        &self,
        session_id: Uuid,
        section: Section,
        module_slot: i32,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM exam_answers
               WHERE session_id = $1 AND section = $2 AND module_slot = $3 AND is_correct"#,
        )
        .bind(session_id)
        .bind(section.as_str())
        .bind(module_slot)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn daily_stats(&self, from: Option<NaiveDate>, to: NaiveDate) -> Result<Vec<DailyStats>> {
        let rows = sqlx::query_as::<_, DailyStats>(
            r#"SELECT stat_date, tests_completed FROM daily_stats
               WHERE ($1::date IS NULL OR stat_date >= $1) AND stat_date <= $2
               ORDER BY stat_date"#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<Payment> {
        let row = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                id, user_id, payment_method, amount, status, card_last4, card_expiry,
                transaction_id, payment_type, consumed_session_id, created_at, completed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(payment.id)
        .bind(payment.user_id)
        .bind(payment.payment_method.as_str())
        .bind(payment.amount)
        .bind(payment.status.as_str())
        .bind(payment.card_last4.as_deref())
        .bind(payment.card_expiry.as_deref())
        .bind(&payment.transaction_id)
        .bind(payment.payment_type.as_str())
        .bind(payment.consumed_session_id)
        .bind(payment.created_at)
        .bind(payment.completed_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn set_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, Payment>(
            r#"UPDATE payments SET status = $2, completed_at = COALESCE($3, completed_at)
               WHERE id = $1 RETURNING *"#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(completed_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_exam_credit(&self, user_id: Uuid) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, Payment>(
            r#"SELECT * FROM payments
               WHERE user_id = $1 AND payment_type = 'exam' AND status = 'completed'
                 AND consumed_session_id IS NULL
               ORDER BY created_at LIMIT 1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_payments(&self, limit: i64) -> Result<Vec<Payment>> {
        let rows = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn payment_summary(&self) -> Result<PaymentSummary> {
        let (total_revenue, exam_count, subscription_count): (Decimal, i64, i64) =
            sqlx::query_as(
                r#"SELECT
                       COALESCE(SUM(amount), 0),
                       COUNT(*) FILTER (WHERE payment_type = 'exam'),
                       COUNT(*) FILTER (WHERE payment_type = 'subscription')
                   FROM payments WHERE status = 'completed'"#,
            )
            .fetch_one(&self.pool)
            .await?;
        Ok(PaymentSummary {
            total_revenue,
            exam_count,
            subscription_count,
        })
    }

    async fn get_pricing(&self) -> Result<PricingSettings> {
        let row = sqlx::query_as::<_, PricingSettings>(
            "SELECT exam_price, subscription_price, updated_at FROM pricing_settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.unwrap_or_default())
    }

    async fn update_pricing(
        &self,
        exam_price: Decimal,
        subscription_price: Decimal,
    ) -> Result<PricingSettings> {
        let row = sqlx::query_as::<_, PricingSettings>(
            r#"
            INSERT INTO pricing_settings (id, exam_price, subscription_price, updated_at)
            VALUES (1, $1, $2, NOW())
            ON CONFLICT (id) DO UPDATE SET
                exam_price = EXCLUDED.exam_price,
                subscription_price = EXCLUDED.subscription_price,
                updated_at = NOW()
            RETURNING exam_price, subscription_price, updated_at
            "#,
        )
        .bind(exam_price)
        .bind(subscription_price)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_audit_log(&self, log: &AuditLog) -> Result<AuditLog> {
        let row = sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs (id, user_id, action, entity_type, entity_id, changes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(log.id)
        .bind(log.user_id)
        .bind(&log.action)
        .bind(&log.entity_type)
        .bind(log.entity_id)
        .bind(&log.changes)
        .bind(log.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
