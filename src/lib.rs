pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use crate::config::DenominatorPolicy;
use crate::database::store::ExamStore;
use crate::services::{
    audit_service::AuditService,
    catalog_service::CatalogService,
    exam_service::ExamService,
    payment_service::{PaymentGateway, PaymentService, StubGateway},
    stats_service::StatsService,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ExamStore>,
    pub exam_service: ExamService,
    pub catalog_service: CatalogService,
    pub stats_service: StatsService,
    pub payment_service: PaymentService,
    pub audit_service: AuditService,
}

impl AppState {
    pub fn new(store: Arc<dyn ExamStore>) -> Self {
        let config = crate::config::get_config();
        let gateway = Arc::new(StubGateway::new(Duration::from_millis(
            config.payment_delay_ms,
        )));
        Self::with_gateway(store, gateway, config.score_denominators)
    }

    pub fn with_gateway(
        store: Arc<dyn ExamStore>,
        gateway: Arc<dyn PaymentGateway>,
        policy: DenominatorPolicy,
    ) -> Self {
        Self {
            exam_service: ExamService::new(store.clone(), policy),
            catalog_service: CatalogService::new(store.clone()),
            stats_service: StatsService::new(store.clone()),
            payment_service: PaymentService::new(store.clone(), gateway),
            audit_service: AuditService::new(store.clone()),
            store,
        }
    }
}
