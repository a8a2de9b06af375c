//! MCP service implementation.
//!
//! `FmgMcpService` implements `rmcp::ServerHandler`: `list_tools` renders
//! the declarative registry into `Tool` entries, `call_tool` routes the
//! request through the tool modules and shapes the result.
//!
//! Error policy: bad arguments surface as `invalid_params` protocol
//! errors; appliance/transport failures are ordinary tool results with
//! `{"status": "error"}` so the calling agent can read and react to them;
//! an unknown tool name is a protocol error.

use rmcp::{
    handler::server::ServerHandler,
    model::{
        CallToolRequestParams, CallToolResult, Content, ErrorData as McpError, Implementation,
        ListToolsResult, PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo,
        Tool, ToolsCapability,
    },
    service::{RequestContext, RoleServer},
};
use serde_json::{Value, json};
use std::sync::Arc;

use fmg_api::{FmgClient, FmgError};

use crate::tools;

#[derive(Clone)]
pub struct FmgMcpService {
    pub client: Arc<FmgClient>,
}

impl FmgMcpService {
    pub fn new(client: Arc<FmgClient>) -> Self {
        Self { client }
    }

    fn render(value: Value) -> CallToolResult {
        let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
        CallToolResult::success(vec![Content::text(text)])
    }
}

#[allow(clippy::manual_async_fn)]
impl ServerHandler for FmgMcpService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
                ..Default::default()
            },
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                title: Some("FortiManager MCP server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Tools for managing FortiGate devices through FortiManager: ADOMs, devices, \
                 policy packages, firewall objects, CLI scripts and templates. Operations that \
                 report a task_id run asynchronously on the appliance; follow up with \
                 wait_for_task to block until they finish."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move {
            let tools = tools::all_specs()
                .map(|spec| Tool {
                    name: spec.name.into(),
                    title: Some(spec.name.to_string()),
                    icons: None,
                    description: Some(spec.description.into()),
                    input_schema: spec.input_schema(),
                    output_schema: None,
                    annotations: None,
                    meta: None,
                })
                .collect();

            Ok(ListToolsResult {
                meta: None,
                tools,
                next_cursor: None,
            })
        }
    }

    fn call_tool(
        &self,
        params: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            let tool_name = params.name.to_string();
            let args = params.arguments.unwrap_or_default();
            tracing::info!(tool = %tool_name, "tool call");

            // The startup connection attempt may have failed (appliance down,
            // credentials rotated); try again once per call until it sticks.
            if !self.client.is_connected()
                && let Err(err) = self.client.connect().await
            {
                tracing::warn!("FortiManager connection attempt failed: {err}");
                return Ok(Self::render(json!({
                    "status": "error",
                    "message": format!("not connected to FortiManager: {err}"),
                })));
            }

            match tools::dispatch(&self.client, &tool_name, &args).await {
                Some(Ok(value)) => Ok(Self::render(value)),
                Some(Err(FmgError::Validation(message))) => {
                    tracing::warn!(tool = %tool_name, "invalid arguments: {message}");
                    Err(McpError::invalid_params(message, None))
                }
                Some(Err(err)) => {
                    tracing::error!(tool = %tool_name, "tool failed: {err}");
                    Ok(Self::render(json!({
                        "status": "error",
                        "message": err.to_string(),
                    })))
                }
                None => {
                    let message = format!("Tool '{tool_name}' not found.");
                    tracing::error!("{message}");
                    Err(McpError::invalid_params(
                        message,
                        Some(json!({"tool_name": tool_name})),
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> FmgMcpService {
        let client = FmgClient::builder("fmg.test.invalid")
            .token("test-token")
            .build()
            .expect("client builds");
        FmgMcpService::new(Arc::new(client))
    }

    #[test]
    fn get_info_advertises_tools() {
        let info = test_service().get_info();
        assert!(info.capabilities.tools.is_some());
        assert_eq!(info.server_info.name, "fmg_mcp");
        assert!(info.instructions.is_some());
    }

    #[test]
    fn render_produces_pretty_json_text() {
        let result = FmgMcpService::render(json!({"status": "success", "count": 2}));
        assert!(!result.content.is_empty());
        if let Some(content) = result.content.first()
            && let Some(text_content) = content.as_text()
        {
            assert!(text_content.text.contains("\"status\": \"success\""));
        } else {
            panic!("expected text content");
        }
    }
}
