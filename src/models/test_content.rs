use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    English,
    Math,
}

text_enum!(Section, "section", {
    English => "english",
    Math => "math",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    EnglishModule1,
    EnglishModule2,
    MathModule1,
    MathModule2,
}

text_enum!(ModuleKind, "module kind", {
    EnglishModule1 => "english_module1",
    EnglishModule2 => "english_module2",
    MathModule1 => "math_module1",
    MathModule2 => "math_module2",
});

impl ModuleKind {
    pub const ALL: [ModuleKind; 4] = [
        ModuleKind::EnglishModule1,
        ModuleKind::EnglishModule2,
        ModuleKind::MathModule1,
        ModuleKind::MathModule2,
    ];

    pub fn section(&self) -> Section {
        match self {
            ModuleKind::EnglishModule1 | ModuleKind::EnglishModule2 => Section::English,
            ModuleKind::MathModule1 | ModuleKind::MathModule2 => Section::Math,
        }
    }

    /// Position of the module inside its section (1 or 2).
    pub fn slot(&self) -> i32 {
        match self {
            ModuleKind::EnglishModule1 | ModuleKind::MathModule1 => 1,
            ModuleKind::EnglishModule2 | ModuleKind::MathModule2 => 2,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ModuleKind::EnglishModule1 => "English (Module 1)",
            ModuleKind::EnglishModule2 => "English (Module 2)",
            ModuleKind::MathModule1 => "Math (Module 1)",
            ModuleKind::MathModule2 => "Math (Module 2)",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

text_enum!(Difficulty, "difficulty", {
    Easy => "easy",
    Medium => "medium",
    Hard => "hard",
});

/// One module row of the catalog. `questions` keeps whatever JSON the admin
/// panel stored; use [`crate::models::question::Question::normalize_all`] to
/// read it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestContent {
    pub id: Uuid,
    pub test_set_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub module_kind: ModuleKind,
    #[sqlx(try_from = "String")]
    pub difficulty: Difficulty,
    pub duration_seconds: i32,
    pub questions: JsonValue,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestContent {
    pub fn question_count(&self) -> usize {
        self.questions.as_array().map(Vec::len).unwrap_or(0)
    }

    /// Grouping key used to join legacy module rows that only share a title.
    pub fn title_key(&self) -> String {
        self.title.trim().to_lowercase()
    }

    /// Heading shown above the questions, e.g. `Mock 3 - Math (Module 2)`.
    pub fn section_title(&self) -> String {
        format!("{} - {}", self.title, self.module_kind.display_name())
    }
}
