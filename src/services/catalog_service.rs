use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::database::store::{ExamStore, ModuleFilter, ModuleLookup};
use crate::dto::catalog_dto::{
    SaveModuleRequest, SavedModuleResponse, TestSetSummary, UpdateModuleRequest,
};
use crate::error::{Error, Result};
use crate::models::question::Question;
use crate::models::test_content::{ModuleKind, TestContent};

/// Suffixes admins appended to per-module titles before sets had ids.
const TITLE_SUFFIXES: [&str; 6] = [
    " - Reading",
    " - Writing",
    " - English",
    " - Math",
    " - Module 1",
    " - Module 2",
];

/// Strips every module suffix from a title and trims the rest.
pub fn normalize_title(title: &str) -> String {
    let mut base = title.to_string();
    for suffix in TITLE_SUFFIXES {
        base = base.replace(suffix, "");
    }
    base.trim().to_string()
}

/// A module row together with its questions in canonical form.
#[derive(Debug, Clone)]
pub struct ModuleContent {
    pub content: TestContent,
    pub questions: Vec<Question>,
}

impl ModuleContent {
    pub fn new(content: TestContent) -> Self {
        let questions = Question::normalize_all(&content.questions);
        Self { content, questions }
    }

    pub fn question_count(&self) -> i32 {
        self.questions.len() as i32
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn ExamStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn ExamStore>) -> Self {
        Self { store }
    }

    /// Newest active english module 1 titled `title`, ignoring case.
    pub async fn find_entry_module(&self, title: &str) -> Result<Option<ModuleContent>> {
        let lookup = ModuleLookup::TitleIgnoreCase(title.to_string());
        Ok(self
            .store
            .find_active_module(ModuleKind::EnglishModule1, &lookup)
            .await?
            .map(ModuleContent::new))
    }

    /// Active sibling of `current` with kind `target`. Tries the explicit set
    /// id, then the exact title, then the suffix-stripped title as a
    /// substring. Rows without questions count as missing.
    pub async fn find_next_module(
        &self,
        current: &TestContent,
        target: ModuleKind,
    ) -> Result<Option<TestContent>> {
        let mut lookups = Vec::with_capacity(3);
        if let Some(set_id) = current.test_set_id {
            lookups.push(ModuleLookup::InSet(set_id));
        }
        lookups.push(ModuleLookup::ExactTitle(current.title.clone()));
        let base = normalize_title(&current.title);
        if !base.is_empty() {
            lookups.push(ModuleLookup::TitleContains(base));
        }

        for lookup in &lookups {
            if let Some(found) = self.store.find_active_module(target, lookup).await? {
                if found.question_count() > 0 {
                    return Ok(Some(found));
                }
            }
        }
        tracing::debug!(from = %current.id, target = %target, "no sibling module");
        Ok(None)
    }

    /// Module a new session starts on. A known active `test_id` is redirected
    /// to its set's english module 1: first by set id, then by the row's own
    /// title ignoring case. Unknown or inactive ids fall back to the newest
    /// active english module 1.
    pub async fn resolve_start_module(&self, test_id: Option<Uuid>) -> Result<Option<TestContent>> {
        if let Some(id) = test_id {
            match self.store.get_test_content(id).await? {
                Some(row) if row.is_active => {
                    if row.module_kind == ModuleKind::EnglishModule1 {
                        return Ok(Some(row));
                    }
                    if let Some(set_id) = row.test_set_id {
                        let lookup = ModuleLookup::InSet(set_id);
                        let in_set = self
                            .store
                            .find_active_module(ModuleKind::EnglishModule1, &lookup)
                            .await?;
                        if let Some(entry) = in_set {
                            return Ok(Some(entry));
                        }
                    }
                    let entry = self.find_entry_module(&row.title).await?;
                    return Ok(Some(entry.map(|m| m.content).unwrap_or(row)));
                }
                _ => {
                    tracing::warn!(test_id = %id, "unknown or inactive test, using latest");
                }
            }
        }
        self.store
            .find_active_module(ModuleKind::EnglishModule1, &ModuleLookup::Latest)
            .await
    }

    pub async fn load_module(&self, id: Uuid) -> Result<Option<ModuleContent>> {
        Ok(self
            .store
            .get_test_content(id)
            .await?
            .map(ModuleContent::new))
    }

    pub async fn list_modules(&self, filter: &ModuleFilter) -> Result<Vec<TestContent>> {
        self.store.list_test_contents(filter).await
    }

    pub async fn get_module(&self, id: Uuid) -> Result<TestContent> {
        self.store
            .get_test_content(id)
            .await?
            .ok_or_else(|| Error::NotFound("Test content not found".to_string()))
    }

    /// Creates or replaces the module of `req.module_kind` under `req.title`.
    /// All rows of one title share a `test_set_id`; legacy rows of the title
    /// are backfilled when the id is first assigned.
    pub async fn save_module(&self, req: SaveModuleRequest) -> Result<SavedModuleResponse> {
        ensure_question_list(&req.questions)?;
        let title = req.title.trim().to_string();
        let key = title.to_lowercase();

        let same_title: Vec<TestContent> = self
            .store
            .list_test_contents(&ModuleFilter::default())
            .await?
            .into_iter()
            .filter(|c| c.title_key() == key)
            .collect();
        let set_id = same_title
            .iter()
            .find_map(|c| c.test_set_id)
            .unwrap_or_else(Uuid::new_v4);

        for row in same_title.iter().filter(|c| c.test_set_id.is_none()) {
            let mut row = row.clone();
            row.test_set_id = Some(set_id);
            self.store.update_test_content(&row).await?;
        }

        let existing = self
            .store
            .find_content_by_title(&title, req.module_kind)
            .await?;
        let now = Utc::now();
        let (module, created) = match existing {
            Some(mut row) => {
                row.test_set_id = Some(set_id);
                row.title = title;
                row.description = req.description;
                row.difficulty = req.difficulty;
                row.duration_seconds = req.duration_seconds;
                row.questions = req.questions;
                row.is_active = req.is_active;
                let updated = self
                    .store
                    .update_test_content(&row)
                    .await?
                    .ok_or_else(|| Error::NotFound("Test content not found".to_string()))?;
                (updated, false)
            }
            None => {
                let row = TestContent {
                    id: Uuid::new_v4(),
                    test_set_id: Some(set_id),
                    title,
                    description: req.description,
                    module_kind: req.module_kind,
                    difficulty: req.difficulty,
                    duration_seconds: req.duration_seconds,
                    questions: req.questions,
                    is_active: req.is_active,
                    created_at: now,
                    updated_at: now,
                };
                (self.store.insert_test_content(&row).await?, true)
            }
        };

        let is_complete = self.is_complete_set(&module.title).await?;
        tracing::info!(
            module_id = %module.id,
            kind = %module.module_kind,
            created,
            is_complete,
            "test content saved"
        );
        Ok(SavedModuleResponse {
            module,
            created,
            is_complete,
        })
    }

    pub async fn update_module(&self, id: Uuid, req: UpdateModuleRequest) -> Result<TestContent> {
        let mut row = self.get_module(id).await?;
        if let Some(title) = req.title {
            row.title = title.trim().to_string();
        }
        if let Some(description) = req.description {
            row.description = description;
        }
        if let Some(kind) = req.module_kind {
            row.module_kind = kind;
        }
        if let Some(difficulty) = req.difficulty {
            row.difficulty = difficulty;
        }
        if let Some(duration) = req.duration_seconds {
            row.duration_seconds = duration;
        }
        if let Some(questions) = req.questions {
            ensure_question_list(&questions)?;
            row.questions = questions;
        }
        if let Some(active) = req.is_active {
            row.is_active = active;
        }
        self.store
            .update_test_content(&row)
            .await?
            .ok_or_else(|| Error::NotFound("Test content not found".to_string()))
    }

    /// Sessions pointing at the row keep running with a cleared pointer and
    /// fail with missing content on their next read.
    pub async fn delete_module(&self, id: Uuid) -> Result<()> {
        if !self.store.delete_test_content(id).await? {
            return Err(Error::NotFound("Test content not found".to_string()));
        }
        tracing::info!(module_id = %id, "test content deleted");
        Ok(())
    }

    pub async fn is_complete_set(&self, title: &str) -> Result<bool> {
        let lookup = ModuleLookup::TitleIgnoreCase(title.to_string());
        for kind in ModuleKind::ALL {
            if self.store.find_active_module(kind, &lookup).await?.is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Complete sets users can start, grouped by case-insensitive title.
    pub async fn list_available_sets(&self) -> Result<Vec<TestSetSummary>> {
        let active = self
            .store
            .list_test_contents(&ModuleFilter {
                kind: None,
                is_active: Some(true),
            })
            .await?;

        // Rows arrive newest first, so the first row per kind wins.
        let mut groups: HashMap<String, HashMap<ModuleKind, TestContent>> = HashMap::new();
        for row in active {
            groups
                .entry(row.title_key())
                .or_default()
                .entry(row.module_kind)
                .or_insert(row);
        }

        let mut sets: Vec<TestSetSummary> = groups
            .into_values()
            .filter(|modules| modules.len() == ModuleKind::ALL.len())
            .filter_map(|modules| {
                let entry = modules.get(&ModuleKind::EnglishModule1)?;
                Some(TestSetSummary {
                    test_id: entry.id,
                    title: entry.title.clone(),
                    description: entry.description.clone(),
                    difficulty: entry.difficulty,
                    total_questions: modules.values().map(TestContent::question_count).sum(),
                    total_duration_seconds: modules.values().map(|m| m.duration_seconds).sum(),
                })
            })
            .collect();
        sets.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        Ok(sets)
    }
}

fn ensure_question_list(questions: &serde_json::Value) -> Result<()> {
    if questions.is_array() {
        Ok(())
    } else {
        Err(Error::BadRequest("questions must be a JSON array".to_string()))
    }
}
