//! MCP tool implementations.
//!
//! Each tool delivers one kind of event to the worker, or reports on the
//! state of its caches.

pub mod cache;
pub mod sw_fetch;
pub mod sw_lifecycle;
pub mod sw_message;

pub use sw_fetch::SwFetchParams;
pub use sw_message::SwMessageParams;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use swcache_core::Error;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
