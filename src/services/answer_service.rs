use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::database::store::ExamStore;
use crate::error::Result;
use crate::models::exam_answer::{ExamAnswer, NewAnswer};
use crate::models::exam_session::ExamSession;
use crate::services::catalog_service::ModuleContent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Recorded { is_correct: bool },
    /// Malformed or out-of-range input; nothing was written.
    Rejected,
}

impl AnswerOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, AnswerOutcome::Recorded { .. })
    }
}

/// Accepts a non-negative integer or a string holding one.
pub fn parse_question_index(raw: &JsonValue) -> Option<i32> {
    let index = match raw {
        JsonValue::Number(n) => n.as_i64()?,
        JsonValue::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    i32::try_from(index).ok().filter(|i| *i >= 0)
}

#[derive(Clone)]
pub struct AnswerService {
    store: Arc<dyn ExamStore>,
}

impl AnswerService {
    pub fn new(store: Arc<dyn ExamStore>) -> Self {
        Self { store }
    }

    /// Stores the choice for one question of the module being served. The
    /// answer is keyed by the module's section and slot, so the two modules
    /// of a section never share rows.
    pub async fn record(
        &self,
        session: &ExamSession,
        module: &ModuleContent,
        raw_index: &JsonValue,
        selected: &str,
    ) -> Result<AnswerOutcome> {
        let Some(index) = parse_question_index(raw_index) else {
            tracing::warn!(session_id = %session.id, index = %raw_index, "malformed question index");
            return Ok(AnswerOutcome::Rejected);
        };
        let Some(question) = module.questions.get(index as usize) else {
            tracing::warn!(
                session_id = %session.id,
                index,
                question_count = module.questions.len(),
                "question index out of range"
            );
            return Ok(AnswerOutcome::Rejected);
        };
        if selected.trim().is_empty() {
            tracing::warn!(session_id = %session.id, index, "empty answer label");
            return Ok(AnswerOutcome::Rejected);
        }

        let kind = module.content.module_kind;
        let is_correct = question.is_correct(selected);
        self.store
            .upsert_answer(&NewAnswer {
                session_id: session.id,
                section: kind.section(),
                module_slot: kind.slot(),
                question_index: index,
                selected_answer: selected.to_string(),
                is_correct,
            })
            .await?;
        Ok(AnswerOutcome::Recorded { is_correct })
    }

    /// Answers already given for the module, for restoring client state.
    pub async fn restore(&self, session: &ExamSession, module: &ModuleContent) -> Result<Vec<ExamAnswer>> {
        let kind = module.content.module_kind;
        self.store
            .list_answers(session.id, kind.section(), kind.slot())
            .await
    }

    pub async fn correct_count(&self, session: &ExamSession, module: &ModuleContent) -> Result<i32> {
        let kind = module.content.module_kind;
        let count = self
            .store
            .count_correct(session.id, kind.section(), kind.slot())
            .await?;
        Ok(count as i32)
    }
}
