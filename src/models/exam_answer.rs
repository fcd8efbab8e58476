use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::test_content::Section;

/// One recorded choice. Unique per (session, section, module slot, index).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExamAnswer {
    pub id: Uuid,
    pub session_id: Uuid,
    #[sqlx(try_from = "String")]
    pub section: Section,
    pub module_slot: i32,
    pub question_index: i32,
    pub selected_answer: Option<String>,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub session_id: Uuid,
    pub section: Section,
    pub module_slot: i32,
    pub question_index: i32,
    pub selected_answer: String,
    pub is_correct: bool,
}
