//! Waitroom Client Implementation

use crate::error::{Result, SdkError};
use crate::types::{
    ClearResponse, JoinRequest, JoinResponse, LeaveResponse, QueueEventMessage, QueueInfo,
    StatusResponse, VerifyResponse,
};
use futures::StreamExt;
use jsonrpsee::core::client::{ClientT, Subscription, SubscriptionClientT};
use jsonrpsee::core::params::ObjectParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use std::time::Duration;

/// Waitroom Client
///
/// Provides a high-level interface to the Waitroom daemon.
///
/// # Example
///
/// ```no_run
/// use waitroom_sdk::WaitroomClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = WaitroomClient::connect("http://127.0.0.1:9530").await?;
/// let info = client.info().await?;
/// println!("{} waiting", info.queue_length);
/// # Ok(())
/// # }
/// ```
pub struct WaitroomClient {
    client: HttpClient,
    ws_url: String,
}

impl WaitroomClient {
    /// Connect to the Waitroom daemon
    ///
    /// # Arguments
    ///
    /// * `url` - RPC endpoint URL (e.g., `http://127.0.0.1:9530`)
    pub async fn connect(url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref();

        let client = HttpClientBuilder::default()
            .request_timeout(Duration::from_secs(30))
            .build(url)
            .map_err(|e| SdkError::Connection(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            client,
            ws_url: to_ws_url(url),
        })
    }

    /// Join the waiting room
    ///
    /// Returns `can_access = true` with an access token when a slot was
    /// free, otherwise the queue position.
    pub async fn join(&self, request: JoinRequest) -> Result<JoinResponse> {
        let mut params = ObjectParams::new();
        params.insert("user_id", &request.user_id)?;
        if let Some(email) = &request.email {
            params.insert("email", email)?;
        }
        if let Some(metadata) = &request.metadata {
            params.insert("metadata", metadata)?;
        }

        let response: JoinResponse = self.client.request("queue.join.v1", params).await?;
        Ok(response)
    }

    /// Leave the waiting room (or give up an active slot)
    pub async fn leave(&self, user_id: impl AsRef<str>) -> Result<LeaveResponse> {
        let response: LeaveResponse = self
            .client
            .request("queue.leave.v1", user_params(user_id.as_ref())?)
            .await?;
        Ok(response)
    }

    /// Current position or access state
    ///
    /// A user that is neither waiting nor active yields
    /// `SdkError::Rpc` with code 4001 (see [`SdkError::is_not_found`]).
    pub async fn status(&self, user_id: impl AsRef<str>) -> Result<StatusResponse> {
        let response: StatusResponse = self
            .client
            .request("queue.status.v1", user_params(user_id.as_ref())?)
            .await?;
        Ok(response)
    }

    /// Check an access token
    pub async fn verify(&self, access_token: impl AsRef<str>) -> Result<VerifyResponse> {
        let mut params = ObjectParams::new();
        params.insert("access_token", access_token.as_ref())?;

        let response: VerifyResponse = self.client.request("queue.verify.v1", params).await?;
        Ok(response)
    }

    /// Queue length, capacity and the head of the queue
    pub async fn info(&self) -> Result<QueueInfo> {
        let response: QueueInfo = self.client.request("admin.info.v1", rpc_params![]).await?;
        Ok(response)
    }

    /// Drop every waiting entry and active slot
    pub async fn clear(&self) -> Result<ClearResponse> {
        let response: ClearResponse = self.client.request("admin.clear.v1", rpc_params![]).await?;
        Ok(response)
    }

    /// Open a WebSocket subscription for one user's events
    ///
    /// Dropping the stream closes the connection, which the daemon treats
    /// as a disconnect.
    pub async fn subscribe(&self, user_id: impl AsRef<str>) -> Result<EventStream> {
        let client = WsClientBuilder::default()
            .build(&self.ws_url)
            .await
            .map_err(|e| SdkError::Connection(format!("Failed to open websocket: {}", e)))?;

        let subscription: Subscription<QueueEventMessage> = client
            .subscribe(
                "queue.subscribe.v1",
                user_params(user_id.as_ref())?,
                "queue.unsubscribe.v1",
            )
            .await?;

        Ok(EventStream {
            _client: client,
            subscription,
        })
    }
}

/// Live event feed for one user
pub struct EventStream {
    // Dropping the client tears down the subscription
    _client: WsClient,
    subscription: Subscription<QueueEventMessage>,
}

impl EventStream {
    /// Next event; `Err(SubscriptionClosed)` once the server goes away
    pub async fn next(&mut self) -> Result<QueueEventMessage> {
        match self.subscription.next().await {
            Some(Ok(event)) => Ok(event),
            Some(Err(e)) => Err(SdkError::Serialization(e)),
            None => Err(SdkError::SubscriptionClosed),
        }
    }

    /// Skip events until one with the given name arrives
    pub async fn next_named(&mut self, event: &str) -> Result<QueueEventMessage> {
        loop {
            let next = self.next().await?;
            if next.event == event {
                return Ok(next);
            }
        }
    }
}

fn user_params(user_id: &str) -> Result<ObjectParams> {
    let mut params = ObjectParams::new();
    params.insert("user_id", user_id)?;
    Ok(params)
}

fn to_ws_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_url_derivation() {
        assert_eq!(to_ws_url("http://127.0.0.1:9530"), "ws://127.0.0.1:9530");
        assert_eq!(to_ws_url("https://wait.example.com"), "wss://wait.example.com");
        assert_eq!(to_ws_url("ws://127.0.0.1:1"), "ws://127.0.0.1:1");
    }

    #[test]
    fn test_user_params_shape() {
        use jsonrpsee::core::traits::ToRpcParams;

        let raw = user_params("alice").unwrap().to_rpc_params().unwrap().unwrap();
        assert_eq!(raw.get(), r#"{"user_id":"alice"}"#);
    }
}
