use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Implementation, JsonObject, ListToolsResult,
    PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::tools::{Arguments, Registry};

const SERVER_NAME: &str = "clockify-mcp";

const INSTRUCTIONS: &str = "Clockify time tracking. Tools are named clockify_<area>_<action>. \
    Every workspace-scoped tool takes an optional workspace_id and falls back to the default \
    workspace. Results are JSON text.";

/// MCP front for the tool registry. The protocol version is the one this
/// server speaks, whatever the client asks for.
#[derive(Clone)]
pub struct ClockifyServer {
    registry: Arc<Registry>,
}

impl ClockifyServer {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn tools(&self) -> Vec<rmcp::model::Tool> {
        self.registry
            .tools()
            .iter()
            .map(|tool| tool.descriptor())
            .collect()
    }

    /// Runs one tool call until it finishes or `cancel` fires. Cancelling
    /// drops the call, and with it any request still waiting on Clockify.
    pub async fn run_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
        cancel: &CancellationToken,
    ) -> Result<CallToolResult, McpError> {
        let args = Arguments::new(arguments.unwrap_or_default());
        tokio::select! {
            result = self.registry.call(name, &args) => result.ok_or_else(|| {
                McpError::invalid_params(format!("Unknown tool: {name}"), None)
            }),
            () = cancel.cancelled() => {
                info!(tool = name, "tool call cancelled");
                Err(McpError::internal_error("request cancelled", None))
            }
        }
    }
}

impl ServerHandler for ClockifyServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        debug!("listing tools");
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.run_tool(&request.name, request.arguments, &context.ct)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::registry;
    use crate::transport;
    use mockito::Server as MockServer;
    use rmcp::ServiceExt;
    use rmcp::model::ErrorCode;
    use serde_json::{Value, json};
    use std::io::Write as _;
    use std::time::{Duration, Instant};
    use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};

    fn server(mock: &MockServer) -> ClockifyServer {
        ClockifyServer::new(registry(mock, "w1"))
    }

    fn object(value: Value) -> Option<JsonObject> {
        value.as_object().cloned()
    }

    async fn next_reply<R: AsyncBufRead + Unpin>(replies: &mut Lines<R>) -> Value {
        let line = replies.next_line().await.unwrap().unwrap();
        serde_json::from_str(&line).unwrap()
    }

    fn first_text(result: &CallToolResult) -> &str {
        result
            .content
            .first()
            .and_then(|content| content.as_text())
            .map(|content| content.text.as_str())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn info_advertises_tools_at_the_supported_version() {
        let mock = MockServer::new_async().await;
        let info = server(&mock).get_info();
        assert_eq!(info.protocol_version, ProtocolVersion::LATEST);
        assert!(info.capabilities.tools.is_some());
        assert_eq!(info.server_info.name, "clockify-mcp");
    }

    #[tokio::test]
    async fn tools_expose_schemas() {
        let mock = MockServer::new_async().await;
        let tools = server(&mock).tools();
        assert_eq!(tools.len(), 29);
        let create = tools
            .iter()
            .find(|tool| tool.name == "clockify_time_entry_create")
            .unwrap();
        assert_eq!(create.input_schema["required"], json!(["start", "end"]));
        assert_eq!(
            create.input_schema["properties"]["tag_ids"]["items"]["type"],
            "string"
        );
    }

    #[tokio::test]
    async fn tool_call_returns_text_content() {
        let mut mock = MockServer::new_async().await;
        let _tags = mock
            .mock("GET", "/workspaces/w1/tags")
            .with_status(200)
            .with_body(r#"[{"id":"t1","name":"urgent"}]"#)
            .create_async()
            .await;

        let result = server(&mock)
            .run_tool(
                "clockify_tag_list",
                object(json!({})),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(false));
        assert!(result.structured_content.is_none());
        let tags: Value = serde_json::from_str(first_text(&result)).unwrap();
        assert_eq!(tags[0]["id"], "t1");
    }

    #[tokio::test]
    async fn tool_failure_is_a_result_not_an_rpc_error() {
        let mock = MockServer::new_async().await;
        let result = server(&mock)
            .run_tool("clockify_tag_create", None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(first_text(&result), "name is required");
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let mock = MockServer::new_async().await;
        let err = server(&mock)
            .run_tool("clockify_nope", None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(err.message, "Unknown tool: clockify_nope");
    }

    #[tokio::test]
    async fn cancellation_abandons_the_request_in_flight() {
        let mut mock = MockServer::new_async().await;
        let _slow = mock
            .mock("GET", "/workspaces/w1/tags")
            .with_status(200)
            .with_chunked_body(|body| {
                std::thread::sleep(Duration::from_secs(5));
                body.write_all(b"[]")
            })
            .create_async()
            .await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let outcome = server(&mock)
            .run_tool("clockify_tag_list", None, &cancel)
            .await;
        assert!(outcome.is_err());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn stdio_session_negotiates_and_survives_bad_lines() {
        let mock = MockServer::new_async().await;
        let handler = server(&mock);
        let (client, remote) = tokio::io::duplex(64 * 1024);
        let (remote_read, remote_write) = tokio::io::split(remote);
        let (service_io, _writer) = transport::frame(remote_read, remote_write);
        tokio::spawn(async move {
            if let Ok(running) = handler.serve(service_io).await {
                let _ = running.waiting().await;
            }
        });

        let (client_read, mut client_write) = tokio::io::split(client);
        let mut replies = BufReader::new(client_read).lines();

        client_write
            .write_all(
                concat!(
                    r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":"#,
                    r#"{"protocolVersion":"1999-01-01","capabilities":{},"#,
                    r#""clientInfo":{"name":"test","version":"0.0.0"}}}"#,
                    "\n"
                )
                .as_bytes(),
            )
            .await
            .unwrap();
        let initialized = next_reply(&mut replies).await;
        assert_eq!(initialized["id"], 1);
        assert_ne!(initialized["result"]["protocolVersion"], "1999-01-01");
        assert_eq!(
            initialized["result"]["protocolVersion"],
            serde_json::to_value(ProtocolVersion::LATEST).unwrap()
        );

        client_write
            .write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n")
            .await
            .unwrap();
        client_write.write_all(b"\xff\n").await.unwrap();
        let rejected = next_reply(&mut replies).await;
        assert_eq!(rejected["id"], Value::Null);
        assert_eq!(rejected["error"]["code"], -32700);

        client_write
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n")
            .await
            .unwrap();
        let pong = next_reply(&mut replies).await;
        assert_eq!(pong["id"], 2);
        assert_eq!(pong["result"], json!({}));
    }
}
