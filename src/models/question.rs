use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Canonical multiple-choice question as seen by the exam core.
///
/// Module rows written by different admin-panel versions disagree on field
/// names: options are either flat `option_a`..`option_d` fields or a list of
/// `{label, text}` pairs, the prompt is `text` or `question_text`, and the key
/// is `correct_answer` or `answer`. [`Question::normalize`] folds all of them
/// into this one shape so nothing downstream has to care.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: String,
    pub image: Option<String>,
}

impl Question {
    pub fn normalize(raw: &JsonValue) -> Question {
        let mut question = Question {
            text: first_non_empty(raw, &["text", "question_text"]),
            option_a: text_field(raw, "option_a"),
            option_b: text_field(raw, "option_b"),
            option_c: text_field(raw, "option_c"),
            option_d: text_field(raw, "option_d"),
            correct_answer: first_non_empty(raw, &["correct_answer", "answer"]),
            image: raw
                .get("image")
                .and_then(as_text)
                .filter(|s| !s.trim().is_empty()),
        };

        if let Some(options) = raw.get("options").and_then(JsonValue::as_array) {
            for option in options {
                let label = option
                    .get("label")
                    .and_then(as_text)
                    .unwrap_or_default()
                    .trim()
                    .to_uppercase();
                let text = option.get("text").and_then(as_text).unwrap_or_default();
                match label.as_str() {
                    "A" => question.option_a = text,
                    "B" => question.option_b = text,
                    "C" => question.option_c = text,
                    "D" => question.option_d = text,
                    _ => {}
                }
            }
        }

        question
    }

    /// Normalizes a stored question list; anything that is not a JSON array
    /// yields no questions.
    pub fn normalize_all(raw: &JsonValue) -> Vec<Question> {
        raw.as_array()
            .map(|items| items.iter().map(Question::normalize).collect())
            .unwrap_or_default()
    }

    pub fn is_correct(&self, selected: &str) -> bool {
        !self.correct_answer.is_empty() && selected == self.correct_answer
    }
}

fn as_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_field(raw: &JsonValue, key: &str) -> String {
    raw.get(key).and_then(as_text).unwrap_or_default()
}

fn first_non_empty(raw: &JsonValue, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| raw.get(*key).and_then(as_text))
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_fields_are_used_when_no_option_list() {
        let q = Question::normalize(&json!({
            "question_text": "2 + 2?",
            "option_a": "3",
            "option_b": "4",
            "option_c": "5",
            "option_d": "6",
            "answer": "B"
        }));
        assert_eq!(q.text, "2 + 2?");
        assert_eq!(q.option_b, "4");
        assert_eq!(q.correct_answer, "B");
        assert_eq!(q.image, None);
    }

    #[test]
    fn option_list_overrides_flat_fields_per_label() {
        let q = Question::normalize(&json!({
            "text": "Pick one",
            "option_a": "flat a",
            "option_d": "flat d",
            "options": [
                {"label": "a", "text": "list a"},
                {"label": "B", "text": "list b"},
                {"label": "C", "text": "list c"}
            ],
            "correct_answer": "C",
            "image": "/media/q1.png"
        }));
        assert_eq!(q.option_a, "list a");
        assert_eq!(q.option_b, "list b");
        assert_eq!(q.option_c, "list c");
        assert_eq!(q.option_d, "flat d");
        assert_eq!(q.image.as_deref(), Some("/media/q1.png"));
    }

    #[test]
    fn empty_correct_answer_falls_back_to_legacy_key() {
        let q = Question::normalize(&json!({"text": "x", "correct_answer": "", "answer": "D"}));
        assert_eq!(q.correct_answer, "D");
        assert!(q.is_correct("D"));
        assert!(!q.is_correct("d"));
    }

    #[test]
    fn question_without_key_never_matches() {
        let q = Question::normalize(&json!({"text": "x"}));
        assert!(!q.is_correct(""));
    }

    #[test]
    fn non_array_question_list_is_empty() {
        assert!(Question::normalize_all(&json!({"oops": true})).is_empty());
        assert_eq!(Question::normalize_all(&json!([{}, {}])).len(), 2);
    }
}
