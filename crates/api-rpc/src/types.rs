//! RPC Request Types
//!
//! Defines the JSON-RPC method parameters. Results reuse the core
//! descriptors (camelCase on the wire). Parameter names are snake_case;
//! the camelCase spelling is accepted as an alias.

use serde::{Deserialize, Serialize};
use waitroom_core::application::JoinRequest;

/// queue.join.v1 - Join the waiting room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinParams {
    #[serde(alias = "userId")]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl From<JoinParams> for JoinRequest {
    fn from(params: JoinParams) -> Self {
        JoinRequest {
            user_id: params.user_id,
            email: params.email,
            metadata: params.metadata,
        }
    }
}

/// queue.leave.v1 / queue.status.v1 / queue.subscribe.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserParams {
    #[serde(alias = "userId")]
    pub user_id: String,
}

/// queue.verify.v1 - Verify an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyParams {
    #[serde(alias = "accessToken")]
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_params_accept_both_spellings() {
        let snake: JoinParams =
            serde_json::from_value(serde_json::json!({"user_id": "a", "email": "a@x.io"})).unwrap();
        let camel: JoinParams =
            serde_json::from_value(serde_json::json!({"userId": "a"})).unwrap();

        assert_eq!(snake.user_id, "a");
        assert_eq!(snake.email.as_deref(), Some("a@x.io"));
        assert_eq!(camel.user_id, "a");
        assert!(camel.metadata.is_none());
    }

    #[test]
    fn test_verify_params_alias() {
        let params: VerifyParams =
            serde_json::from_value(serde_json::json!({"accessToken": "wr_1"})).unwrap();
        assert_eq!(params.access_token, "wr_1");
    }
}
