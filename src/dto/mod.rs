pub mod catalog_dto;
pub mod exam_dto;
pub mod payment_dto;
pub mod stats_dto;
