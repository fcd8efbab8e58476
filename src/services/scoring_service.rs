use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DenominatorPolicy;
use crate::models::exam_session::ExamSession;
use crate::models::test_content::{ModuleKind, Section};
use crate::utils::time::format_duration;

const SECTION_MIN: i64 = 200;
const SECTION_SPAN: i64 = 600;
const SUBSCORE_MIN: i64 = 10;
const SUBSCORE_SPAN: i64 = 30;

/// Bank sizes the first question bank was calibrated against.
const LEGACY_ENGLISH_MODULE: i32 = 27;
const LEGACY_MATH_MODULE: i32 = 22;

fn scale(correct: i32, total: i32, min: i64, span: i64) -> i32 {
    if total <= 0 {
        return min as i32;
    }
    let correct = i64::from(correct.clamp(0, total));
    (min + correct * span / i64::from(total)) as i32
}

/// Maps a raw correct-count onto the 200..=800 section scale.
pub fn scale_module(correct: i32, total: i32) -> i32 {
    scale(correct, total, SECTION_MIN, SECTION_SPAN)
}

/// Maps a raw correct-count onto the 10..=40 sub-score scale.
pub fn scale_subscore(correct: i32, total: i32) -> i32 {
    scale(correct, total, SUBSCORE_MIN, SUBSCORE_SPAN)
}

/// `(section percentile, overall percentile)` for a total score.
pub fn percentile_band(total_score: i32) -> (i32, i32) {
    match total_score {
        s if s >= 1550 => (99, 99),
        s if s >= 1400 => (95, 94),
        s if s >= 1200 => (80, 78),
        s if s >= 1000 => (55, 52),
        _ => (30, 28),
    }
}

/// Raw correct-count of a section and the denominator it is scaled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionTally {
    pub correct: i32,
    pub total: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamResult {
    pub session_id: Uuid,
    pub certificate_id: Option<String>,
    pub english_score: i32,
    pub math_score: i32,
    pub total_score: i32,
    pub reading_score: i32,
    pub writing_score: i32,
    pub math_subscore: i32,
    pub section_percentile: i32,
    pub overall_percentile: i32,
    pub english_correct: i32,
    pub english_questions: i32,
    pub math_correct: i32,
    pub math_questions: i32,
    pub duration: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringService {
    policy: DenominatorPolicy,
}

impl ScoringService {
    pub fn new(policy: DenominatorPolicy) -> Self {
        Self { policy }
    }

    /// Tally for a section from the counters stored on the session. Module 2
    /// counts as taken once it has been scored with a non-zero question count.
    pub fn section_tally(&self, session: &ExamSession, section: Section) -> SectionTally {
        let (first, second) = match section {
            Section::English => (ModuleKind::EnglishModule1, ModuleKind::EnglishModule2),
            Section::Math => (ModuleKind::MathModule1, ModuleKind::MathModule2),
        };
        let took_second = session.module_total(second) > 0;
        let mut correct = session.raw_score(first);
        if took_second {
            correct += session.raw_score(second);
        }
        let total = match self.policy {
            DenominatorPolicy::QuestionCount => {
                session.module_total(first)
                    + if took_second {
                        session.module_total(second)
                    } else {
                        0
                    }
            }
            DenominatorPolicy::Legacy => {
                let per_module = match section {
                    Section::English => LEGACY_ENGLISH_MODULE,
                    Section::Math => LEGACY_MATH_MODULE,
                };
                if took_second {
                    per_module * 2
                } else {
                    per_module
                }
            }
        };
        SectionTally { correct, total }
    }

    pub fn section_score(&self, session: &ExamSession, section: Section) -> i32 {
        let tally = self.section_tally(session, section);
        scale_module(tally.correct, tally.total)
    }

    pub fn result(&self, session: &ExamSession) -> ExamResult {
        let english = self.section_tally(session, Section::English);
        let math = self.section_tally(session, Section::Math);
        let (section_percentile, overall_percentile) = percentile_band(session.total_score);
        let elapsed_seconds = match session.completed_at {
            Some(done) => (done - session.started_at).num_seconds(),
            None => i64::from(session.time_spent),
        };
        let english_sub = scale_subscore(english.correct, english.total);

        ExamResult {
            session_id: session.id,
            certificate_id: session.certificate_id.clone(),
            english_score: session.english_score,
            math_score: session.math_score,
            total_score: session.total_score,
            reading_score: english_sub,
            writing_score: english_sub,
            math_subscore: scale_subscore(math.correct, math.total),
            section_percentile,
            overall_percentile,
            english_correct: english.correct,
            english_questions: english.total,
            math_correct: math.correct,
            math_questions: math.total,
            duration: format_duration(elapsed_seconds),
            started_at: session.started_at,
            completed_at: session.completed_at,
        }
    }
}
