//! JSON-RPC Server
//!
//! Implements the JSON-RPC 2.0 server over TCP (HTTP + WebSocket on one port).

use crate::error::to_rpc_error;
use crate::handler::RpcHandler;
use crate::notify::{BroadcastNotifier, Delivery};
use crate::types::{JoinParams, UserParams, VerifyParams};
use jsonrpsee::core::SubscriptionResult;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::Params;
use jsonrpsee::{PendingSubscriptionSink, RpcModule, SubscriptionMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use waitroom_core::application::WaitingRoomService;
use waitroom_core::error::AppError;

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9530;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
    notifier: BroadcastNotifier,
}

impl RpcServer {
    /// `notifier` must be the same bus the service publishes into
    pub fn new(
        config: RpcServerConfig,
        service: Arc<WaitingRoomService>,
        notifier: BroadcastNotifier,
    ) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(service)),
            notifier,
        }
    }

    /// Start the JSON-RPC server
    ///
    /// Returns the bound address (port 0 picks a free port) and the handle.
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let module = self.build_module()?;

        info!(%local_addr, "JSON-RPC server started successfully");

        let handle = server.start(module);
        Ok((local_addr, handle))
    }

    fn build_module(&self) -> Result<RpcModule<()>, String> {
        let mut module = RpcModule::new(());

        // Queue APIs
        let handler = self.handler.clone();
        module
            .register_async_method("queue.join.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: JoinParams = params.parse()?;
                    handler.join(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.leave.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: UserParams = params.parse()?;
                    handler.leave(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.status.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: UserParams = params.parse()?;
                    handler.status(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.verify.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: VerifyParams = params.parse()?;
                    handler.verify(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        // Admin APIs
        let handler = self.handler.clone();
        module
            .register_async_method("admin.info.v1", move |_, _, _| {
                let handler = handler.clone();
                async move { handler.info().await }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("admin.clear.v1", move |_, _, _| {
                let handler = handler.clone();
                async move { handler.clear().await }
            })
            .map_err(|e| e.to_string())?;

        // Real-time events for one user (plus broadcasts)
        let handler = self.handler.clone();
        let notifier = self.notifier.clone();
        module
            .register_subscription(
                "queue.subscribe.v1",
                "queue.event.v1",
                "queue.unsubscribe.v1",
                move |params, pending, _, _| {
                    let handler = handler.clone();
                    let events = notifier.subscribe();
                    forward_events(handler, events, params, pending)
                },
            )
            .map_err(|e| e.to_string())?;

        Ok(module)
    }
}

/// Pump bus events for one user into a subscription until it closes,
/// then let the service re-check capacity.
async fn forward_events(
    handler: Arc<RpcHandler>,
    mut events: broadcast::Receiver<Delivery>,
    params: Params<'static>,
    pending: PendingSubscriptionSink,
) -> SubscriptionResult {
    let req: UserParams = match params.parse() {
        Ok(req) => req,
        Err(e) => {
            pending.reject(e).await;
            return Ok(());
        }
    };
    if req.user_id.trim().is_empty() {
        pending
            .reject(to_rpc_error(AppError::Validation("userId is required".to_string())))
            .await;
        return Ok(());
    }
    let sink = pending.accept().await?;
    debug!(user_id = %req.user_id, "Subscriber connected");

    loop {
        tokio::select! {
            _ = sink.closed() => break,
            received = events.recv() => match received {
                Ok((audience, event)) => {
                    if !audience.includes(&req.user_id) {
                        continue;
                    }
                    let msg = SubscriptionMessage::from_json(&event)?;
                    if sink.send(msg).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(user_id = %req.user_id, skipped, "Subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    debug!(user_id = %req.user_id, "Subscriber disconnected");
    handler.disconnected(&req.user_id).await;
    Ok(())
}
