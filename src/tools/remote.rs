//! HTTP-backed tools
//!
//! Every catalog tool is served by the tool service under
//! `/api/v1/tools/{tool}/{action}`; the request body is the step params.

use crate::error::OrchestrationError;
use crate::models::ToolParams;
use crate::tools::catalog::{ToolSpec, CATALOG};
use crate::tools::{Tool, ToolAction, ToolRegistry};
use crate::Result;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Clone)]
pub struct ToolServiceClient {
    client: Client,
    base_url: String,
}

impl ToolServiceClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                OrchestrationError::ToolError(format!("Tool service request failed for {}: {}", path, e))
            })?;

        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| OrchestrationError::ToolError(format!("Invalid JSON response: {}", e)))?;

        if !status.is_success() {
            return Err(OrchestrationError::ToolError(format!(
                "Tool service returned {} for {}: {}",
                status, path, body
            )));
        }

        Ok(body)
    }
}

/// A catalog tool executed by the remote tool service
pub struct RemoteTool {
    spec: &'static ToolSpec,
    api: Option<ToolServiceClient>,
}

impl RemoteTool {
    pub fn new(spec: &'static ToolSpec, api: Option<ToolServiceClient>) -> Self {
        Self { spec, api }
    }
}

#[async_trait::async_trait]
impl Tool for RemoteTool {
    fn name(&self) -> &str {
        self.spec.name
    }

    fn description(&self) -> &str {
        self.spec.description
    }

    fn actions(&self) -> &[ToolAction] {
        self.spec.actions
    }

    async fn run(&self, action: &str, params: &ToolParams) -> Result<Value> {
        let api = self.api.as_ref().ok_or_else(|| {
            OrchestrationError::ToolError(
                "FINANCIAL_API_BASE_URL (or TOOLS_API_BASE_URL) is not configured".to_string(),
            )
        })?;

        let path = format!("/api/v1/tools/{}/{}", self.spec.name, action);
        debug!(tool = self.spec.name, action, "Calling tool service");

        let body = api.post_json(&path, &Value::Object(params.clone())).await?;
        into_tool_result(body)
    }
}

/// The service reports domain failures in-band as `{"success": false, "error": ...}`.
fn into_tool_result(body: Value) -> Result<Value> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("tool reported failure")
            .to_string();
        return Err(OrchestrationError::ToolError(message));
    }
    Ok(body)
}

/// Create a registry holding every catalog tool.
pub fn create_default_registry(base_url: Option<&str>) -> Result<ToolRegistry> {
    let api = base_url.map(ToolServiceClient::new).transpose()?;

    let mut registry = ToolRegistry::new();
    for spec in CATALOG {
        registry.register(Arc::new(RemoteTool::new(spec, api.clone())));
    }

    info!(
        tools = registry.len(),
        service = api.as_ref().map(|a| a.base_url()).unwrap_or("<unconfigured>"),
        "Tool registry ready"
    );

    Ok(registry)
}
