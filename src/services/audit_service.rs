use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::database::store::ExamStore;
use crate::error::Result;
use crate::models::audit_log::AuditLog;

#[derive(Clone)]
pub struct AuditService {
    store: Arc<dyn ExamStore>,
}

impl AuditService {
    pub fn new(store: Arc<dyn ExamStore>) -> Self {
        Self { store }
    }

    pub async fn log(
        &self,
        user_id: Option<Uuid>,
        action: &str,
        entity_type: &str,
        entity_id: Uuid,
        changes: Option<JsonValue>,
    ) -> Result<AuditLog> {
        let entry = AuditLog {
            id: Uuid::new_v4(),
            user_id,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            changes,
            created_at: Utc::now(),
        };
        self.store.insert_audit_log(&entry).await
    }

    /// Like [`AuditService::log`], but a failed write only logs a warning.
    pub async fn record(
        &self,
        user_id: Option<Uuid>,
        action: &str,
        entity_type: &str,
        entity_id: Uuid,
        changes: Option<JsonValue>,
    ) {
        if let Err(e) = self
            .log(user_id, action, entity_type, entity_id, changes)
            .await
        {
            tracing::warn!(error = ?e, action, %entity_id, "audit write failed");
        }
    }
}
