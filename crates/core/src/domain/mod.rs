// Domain Layer - Pure admission model

pub mod capacity;
pub mod descriptor;
pub mod entry;
pub mod error;
pub mod event;

// Re-exports
pub use capacity::Capacity;
pub use descriptor::{
    ClearResult, DequeueResult, EnqueueOutcome, JoinedEntry, QueueInfo, QueuedUser,
    StatusDescriptor, WaitEstimate,
};
pub use entry::{
    validate_user_id, ActiveMembership, AdmissionState, EntryAttrs, QueueEntry, UserId,
    WaitingSlot,
};
pub use error::DomainError;
pub use event::{Audience, QueueEvent};
