//! Storage layer
//!
//! Domain records, the injected store contract, and the SeaORM
//! implementation used by the gateway binary and integration tests.

pub mod database;
pub mod memory;
pub mod records;
pub mod store;

pub use database::SeaOrmFilterStore;
pub use memory::MemoryFilterStore;
pub use records::{ContentFilterRecord, FilterViolationRecord};
pub use store::FilterStore;
