//! Waitroom SDK - Rust Client Library
//!
//! Provides a convenient client for the Waitroom daemon.
//!
//! # Example
//!
//! ```no_run
//! use waitroom_sdk::{JoinRequest, WaitroomClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WaitroomClient::connect("http://127.0.0.1:9530").await?;
//!
//!     let joined = client.join(JoinRequest::new("alice")).await?;
//!     if joined.can_access {
//!         println!("Access token: {:?}", joined.access_token);
//!     } else {
//!         println!("Waiting at position {:?}", joined.position);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::{EventStream, WaitroomClient};
pub use error::{code, Result, SdkError};
pub use types::{
    ClearResponse, JoinRequest, JoinResponse, LeaveResponse, QueueEventMessage, QueueInfo,
    QueuedUser, StatusResponse, VerifyResponse, WaitEstimate,
};
