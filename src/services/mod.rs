pub mod answer_service;
pub mod audit_service;
pub mod catalog_service;
pub mod exam_service;
pub mod payment_service;
pub mod scoring_service;
pub mod stats_service;
