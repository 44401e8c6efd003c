//! JSON-RPC API Layer
//!
//! Implements the JSON-RPC 2.0 server for the Waitroom admission API,
//! plus the broadcast notifier that feeds `queue.subscribe.v1`.

pub mod error;
pub mod handler;
pub mod notify;
pub mod server;
pub mod types;

pub use jsonrpsee::server::ServerHandle;
pub use notify::BroadcastNotifier;
pub use server::{RpcServer, RpcServerConfig};
