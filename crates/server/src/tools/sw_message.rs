//! sw_message tool implementation.
//!
//! Posts a page message to the worker. Unknown message types are accepted
//! and ignored.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{Error, ServiceWorker};

use super::json_result;

/// Input parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message type, e.g. "PERFORMANCE_LOG".
    #[serde(rename = "type")]
    pub kind: String,

    /// Message payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageOutput {
    /// Whether the worker recognized the message type.
    pub handled: bool,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(worker: &ServiceWorker, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    if params.kind.trim().is_empty() {
        return Err(Error::InvalidInput("type cannot be empty".into()).into());
    }

    let raw = serde_json::json!({ "type": params.kind, "data": params.data });
    let handled = worker.handle_raw_message(raw);

    json_result(&SwMessageOutput { handled })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing;

    #[tokio::test]
    async fn test_performance_log_is_handled() {
        let worker = testing::worker(&[]).await;
        let params =
            SwMessageParams { kind: "PERFORMANCE_LOG".into(), data: serde_json::json!({ "lcp": 1830, "cls": 0.02 }) };

        let output: SwMessageOutput = testing::output(&message_impl(&worker, params).await.unwrap());
        assert!(output.handled);
    }

    #[tokio::test]
    async fn test_unknown_message_is_ignored() {
        let worker = testing::worker(&[]).await;
        let params = SwMessageParams { kind: "SKIP_WAITING".into(), data: serde_json::Value::Null };

        let output: SwMessageOutput = testing::output(&message_impl(&worker, params).await.unwrap());
        assert!(!output.handled);
    }

    #[tokio::test]
    async fn test_empty_type_rejected() {
        let worker = testing::worker(&[]).await;
        let params = SwMessageParams { kind: " ".into(), data: serde_json::Value::Null };
        assert!(message_impl(&worker, params).await.is_err());
    }
}
