//! SeaORM persistence for filter configuration and the violation log

pub mod entities;
pub mod migration;
mod seaorm_store;

pub use migration::Migrator;
pub use seaorm_store::SeaOrmFilterStore;
