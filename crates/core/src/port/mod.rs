// Port Layer - Interfaces for external dependencies

pub mod admission_store;
pub mod id_provider; // For deterministic testing
pub mod notifier;
pub mod time_provider;
pub mod token_issuer;
pub mod transaction;

// Re-exports
pub use admission_store::{AdmissionStore, InsertOutcome, Removal};
pub use id_provider::{IdProvider, UuidProvider};
pub use notifier::{NoopNotifier, Notifier};
pub use time_provider::{SystemTimeProvider, TimeProvider};
pub use token_issuer::TokenIssuer;
pub use transaction::{PromotionTransaction, Transaction};
