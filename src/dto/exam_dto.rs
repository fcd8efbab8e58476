use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;
use validator::Validate;

use crate::models::exam_answer::ExamAnswer;
use crate::models::exam_session::ExamSession;
use crate::models::question::Question;
use crate::services::exam_service::{ActiveExam, NextAction};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartExamQuery {
    pub test_id: Option<Uuid>,
}

/// Question as sent to the client; the answer key never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub index: usize,
    pub text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl PublicQuestion {
    pub fn new(index: usize, question: &Question) -> Self {
        Self {
            index,
            text: question.text.clone(),
            option_a: question.option_a.clone(),
            option_b: question.option_b.clone(),
            option_c: question.option_c.clone(),
            option_d: question.option_d.clone(),
            image: question.image.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoredAnswer {
    pub question_index: i32,
    pub selected_answer: Option<String>,
}

impl From<ExamAnswer> for RestoredAnswer {
    fn from(answer: ExamAnswer) -> Self {
        Self {
            question_index: answer.question_index,
            selected_answer: answer.selected_answer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartExamResponse {
    pub session: ExamSession,
    pub module_id: Uuid,
    pub questions: Vec<PublicQuestion>,
    pub restored_answers: Vec<RestoredAnswer>,
    pub time_remaining_seconds: i32,
    pub section_title: String,
    pub show_break: bool,
    pub resumed: bool,
}

impl From<ActiveExam> for StartExamResponse {
    fn from(active: ActiveExam) -> Self {
        let time_remaining_seconds = active.time_remaining_seconds();
        let show_break = active.show_break();
        let questions = active
            .module
            .questions
            .iter()
            .enumerate()
            .map(|(i, q)| PublicQuestion::new(i, q))
            .collect();
        Self {
            module_id: active.module.content.id,
            section_title: active.module.content.section_title(),
            session: active.session,
            questions,
            restored_answers: active.restored.into_iter().map(Into::into).collect(),
            time_remaining_seconds,
            show_break,
            resumed: active.resumed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    pub session_id: Uuid,
    /// Integer or numeric string; anything else is ignored.
    pub question_index: JsonValue,
    #[validate(length(max = 8))]
    pub selected_answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TimeUpdateRequest {
    pub session_id: Uuid,
    #[validate(range(min = 0, max = 86400))]
    pub time_spent: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishSectionRequest {
    pub session_id: Uuid,
    pub module_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishSectionResponse {
    pub next_action: NextAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    pub session_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}
