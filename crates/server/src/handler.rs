//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker.
use std::sync::Arc;

use crate::tools::{
    SwFetchParams, SwMessageParams,
    cache::{CacheCleanupParams, buckets_impl, cleanup_impl},
    sw_fetch::fetch_impl,
    sw_lifecycle::{activate_impl, install_impl, status_impl},
    sw_message::message_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use swcache_core::ServiceWorker;

/// The main MCP server handler for mcp-sw.
#[derive(Clone)]
pub struct McpSwServer {
    worker: Arc<ServiceWorker>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl McpSwServer {
    /// Create a new server handler around a worker.
    pub fn new(worker: Arc<ServiceWorker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Deliver a fetch event to the service worker. Returns the response with its source (network, cache, fallback or passthrough). Non-GET and non-http(s) requests pass through uncached."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Run the install phase: precache every configured resource, all or nothing.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(description = "Run the activate phase: delete buckets from earlier versions and claim clients.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    #[tool(description = "Report the worker version, precache bucket name and lifecycle state.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker).await
    }

    #[tool(description = "Post a page message to the worker, e.g. {\"type\": \"PERFORMANCE_LOG\", \"data\": {...}}.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, params.0).await
    }

    #[tool(description = "Trim a bucket to its newest max_entries entries. Returns deleted and remaining counts.")]
    async fn cache_cleanup(&self, params: Parameters<CacheCleanupParams>) -> Result<CallToolResult, McpError> {
        cleanup_impl(&self.worker, params.0).await
    }

    #[tool(description = "List cache buckets with entry counts and whether they belong to the running version.")]
    async fn cache_buckets(&self) -> Result<CallToolResult, McpError> {
        buckets_impl(&self.worker).await
    }
}

impl ServerHandler for McpSwServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mcp-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
