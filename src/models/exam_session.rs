use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::test_content::{ModuleKind, Section};
use super::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Break,
    Completed,
    Abandoned,
}

text_enum!(SessionStatus, "session status", {
    InProgress => "in_progress",
    Break => "break",
    Completed => "completed",
    Abandoned => "abandoned",
});

impl SessionStatus {
    /// Live sessions can still be resumed; at most one per user.
    pub fn is_live(&self) -> bool {
        matches!(self, SessionStatus::InProgress | SessionStatus::Break)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExamSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub test_content_id: Option<Uuid>,
    pub certificate_id: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: SessionStatus,
    #[sqlx(try_from = "String")]
    pub current_section: Section,
    pub current_module: i32,
    pub english_module1_score: i32,
    pub english_module2_score: i32,
    pub math_module1_score: i32,
    pub math_module2_score: i32,
    pub english_module1_total: i32,
    pub english_module2_total: i32,
    pub math_module1_total: i32,
    pub math_module2_total: i32,
    pub english_score: i32,
    pub math_score: i32,
    pub total_score: i32,
    pub time_spent: i32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl ExamSession {
    pub fn new(user_id: Uuid, module_id: Uuid, section: Section, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            test_content_id: Some(module_id),
            certificate_id: None,
            status: SessionStatus::InProgress,
            current_section: section,
            current_module: 1,
            english_module1_score: 0,
            english_module2_score: 0,
            math_module1_score: 0,
            math_module2_score: 0,
            english_module1_total: 0,
            english_module2_total: 0,
            math_module1_total: 0,
            math_module2_total: 0,
            english_score: 0,
            math_score: 0,
            total_score: 0,
            time_spent: 0,
            started_at: now,
            completed_at: None,
            updated_at: now,
        }
    }

    /// Raw correct-count recorded for a module.
    pub fn raw_score(&self, kind: ModuleKind) -> i32 {
        match kind {
            ModuleKind::EnglishModule1 => self.english_module1_score,
            ModuleKind::EnglishModule2 => self.english_module2_score,
            ModuleKind::MathModule1 => self.math_module1_score,
            ModuleKind::MathModule2 => self.math_module2_score,
        }
    }

    /// Question count of a module at the time it was scored.
    pub fn module_total(&self, kind: ModuleKind) -> i32 {
        match kind {
            ModuleKind::EnglishModule1 => self.english_module1_total,
            ModuleKind::EnglishModule2 => self.english_module2_total,
            ModuleKind::MathModule1 => self.math_module1_total,
            ModuleKind::MathModule2 => self.math_module2_total,
        }
    }
}

/// Expected prior state for a conditional session update. A transition only
/// applies while the stored row still matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionGuard {
    pub status: SessionStatus,
    pub test_content_id: Option<Uuid>,
}

impl SessionGuard {
    pub fn of(session: &ExamSession) -> Self {
        Self {
            status: session.status,
            test_content_id: session.test_content_id,
        }
    }

    pub fn matches(&self, session: &ExamSession) -> bool {
        self.status == session.status && self.test_content_id == session.test_content_id
    }
}

/// Aggregate bumps applied when a session completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsDelta {
    pub user_id: Uuid,
    pub total_score: i32,
    pub elapsed_minutes: i32,
    pub day: chrono::NaiveDate,
}

/// Full next state of the mutable session columns. Scores and the transition
/// travel together so they commit in the same write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChange {
    pub status: SessionStatus,
    pub current_section: Section,
    pub current_module: i32,
    pub test_content_id: Option<Uuid>,
    pub english_module1_score: i32,
    pub english_module2_score: i32,
    pub math_module1_score: i32,
    pub math_module2_score: i32,
    pub english_module1_total: i32,
    pub english_module2_total: i32,
    pub math_module1_total: i32,
    pub math_module2_total: i32,
    pub english_score: i32,
    pub math_score: i32,
    pub total_score: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub certificate_id: Option<String>,
    pub stats: Option<StatsDelta>,
}

impl SessionChange {
    pub fn from_session(session: &ExamSession) -> Self {
        Self {
            status: session.status,
            current_section: session.current_section,
            current_module: session.current_module,
            test_content_id: session.test_content_id,
            english_module1_score: session.english_module1_score,
            english_module2_score: session.english_module2_score,
            math_module1_score: session.math_module1_score,
            math_module2_score: session.math_module2_score,
            english_module1_total: session.english_module1_total,
            english_module2_total: session.english_module2_total,
            math_module1_total: session.math_module1_total,
            math_module2_total: session.math_module2_total,
            english_score: session.english_score,
            math_score: session.math_score,
            total_score: session.total_score,
            completed_at: session.completed_at,
            certificate_id: session.certificate_id.clone(),
            stats: None,
        }
    }

    pub fn record_module(&mut self, kind: ModuleKind, correct: i32, total: i32) {
        match kind {
            ModuleKind::EnglishModule1 => {
                self.english_module1_score = correct;
                self.english_module1_total = total;
            }
            ModuleKind::EnglishModule2 => {
                self.english_module2_score = correct;
                self.english_module2_total = total;
            }
            ModuleKind::MathModule1 => {
                self.math_module1_score = correct;
                self.math_module1_total = total;
            }
            ModuleKind::MathModule2 => {
                self.math_module2_score = correct;
                self.math_module2_total = total;
            }
        }
    }

    /// Writes the change onto an in-memory copy of the row.
    pub fn apply_to(&self, session: &mut ExamSession, now: DateTime<Utc>) {
        session.status = self.status;
        session.current_section = self.current_section;
        session.current_module = self.current_module;
        session.test_content_id = self.test_content_id;
        session.english_module1_score = self.english_module1_score;
        session.english_module2_score = self.english_module2_score;
        session.math_module1_score = self.math_module1_score;
        session.math_module2_score = self.math_module2_score;
        session.english_module1_total = self.english_module1_total;
        session.english_module2_total = self.english_module2_total;
        session.math_module1_total = self.math_module1_total;
        session.math_module2_total = self.math_module2_total;
        session.english_score = self.english_score;
        session.math_score = self.math_score;
        session.total_score = self.total_score;
        session.completed_at = session.completed_at.or(self.completed_at);
        if session.certificate_id.is_none() {
            session.certificate_id = self.certificate_id.clone();
        }
        session.updated_at = now;
    }
}

/// Completed session joined with its user and the last module taken.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompletedResult {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub test_content_id: Option<Uuid>,
    pub test_title: Option<String>,
    pub english_score: i32,
    pub math_score: i32,
    pub total_score: i32,
    pub time_spent: i32,
    pub certificate_id: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}
