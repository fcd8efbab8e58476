use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;
use validator::Validate;

use crate::models::test_content::{Difficulty, ModuleKind, TestContent};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SaveModuleRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub module_kind: ModuleKind,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[validate(range(min = 60, max = 14400))]
    pub duration_seconds: i32,
    pub questions: JsonValue,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateModuleRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub module_kind: Option<ModuleKind>,
    pub difficulty: Option<Difficulty>,
    #[validate(range(min = 60, max = 14400))]
    pub duration_seconds: Option<i32>,
    pub questions: Option<JsonValue>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleListQuery {
    pub kind: Option<ModuleKind>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedModuleResponse {
    pub module: TestContent,
    pub created: bool,
    /// All four module kinds now exist under this title.
    pub is_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSetSummary {
    /// Entry module (english module 1); pass as `test_id` to start.
    pub test_id: Uuid,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub total_questions: usize,
    pub total_duration_seconds: i32,
}
