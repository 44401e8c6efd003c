// Waitroom Infrastructure - SQLite Adapter
// Implements: AdmissionStore, PromotionTransaction

mod admission_store;
mod connection;
mod error;
mod migration;
mod transaction;

pub use admission_store::SqliteAdmissionStore;
pub use connection::{create_pool, database_url};
pub use error::map_sqlx_error;
pub use migration::run_migrations;
pub use transaction::SqlitePromotion;

// Note: sqlx::Error conversion is handled by map_sqlx_error
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
