pub mod memory_store;
pub mod pg_store;
pub mod pool;
pub mod store;

pub use memory_store::InMemoryExamStore;
pub use pg_store::PgExamStore;
pub use store::{ExamStore, ModuleFilter, ModuleLookup, ResultFilter, SessionCreated};
