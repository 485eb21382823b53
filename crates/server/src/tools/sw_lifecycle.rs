//! sw_install, sw_activate and sw_status tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{LifecycleStatus, ServiceWorker};

use super::json_result;

/// Output from the sw_status and sw_install tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwStatusOutput {
    pub app_name: String,
    pub version_tag: String,
    /// Name of the precache bucket for this version.
    pub cache_name: String,
    pub lifecycle: LifecycleStatus,
    /// Number of precache resources configured.
    pub precache: usize,
}

/// Output from the sw_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwActivateOutput {
    pub lifecycle: LifecycleStatus,
    /// Buckets left behind by earlier versions and deleted on activation.
    pub deleted_buckets: Vec<String>,
}

async fn status(worker: &ServiceWorker) -> SwStatusOutput {
    let config = worker.config();
    SwStatusOutput {
        app_name: config.app_name.clone(),
        version_tag: config.version_tag.clone(),
        cache_name: config.cache_name(),
        lifecycle: worker.lifecycle().status().await,
        precache: config.precache.len(),
    }
}

/// Implementation of the sw_status tool.
pub async fn status_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    json_result(&status(worker).await)
}

/// Implementation of the sw_install tool.
pub async fn install_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    worker.lifecycle().install().await?;
    json_result(&status(worker).await)
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let deleted_buckets = worker.lifecycle().activate().await?;
    let output = SwActivateOutput { lifecycle: worker.lifecycle().status().await, deleted_buckets };
    json_result(&output)
}
