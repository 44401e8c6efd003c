// Application Layer - Use Cases and Business Logic

pub mod admission;
pub mod estimator;
pub mod scheduler;
pub mod service;

// Re-exports
pub use admission::AdmissionController;
pub use estimator::WaitEstimator;
pub use scheduler::{
    shutdown_channel, Admission, PromotionScheduler, ShutdownSender, ShutdownToken, SweepReport,
};
pub use service::{JoinRequest, JoinResponse, VerifyResponse, WaitingRoomService};
