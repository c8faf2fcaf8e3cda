//! MCP server: session state machine and method dispatch.
//!
//! `initialize` must succeed before `tools/list` or `tools/call` are served.
//! Requests are handled one at a time; a `tools/call` that runs a script
//! holds the loop until the child exits or times out.

use crate::protocol::{
    CallToolParams, InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, RequestId, ServerCapabilities, ServerInfo,
    ToolsCapability, JSONRPC_VERSION, PROTOCOL_VERSION,
};
use crate::tools::ToolRegistry;
use crate::transport::{StdioTransport, TransportError};
use tokio::io::{AsyncRead, AsyncWrite};

/// Name reported in `serverInfo`
pub const SERVER_NAME: &str = "sandbox-mcp";

/// Wire methods understood by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Initialize,
    Initialized,
    ToolsList,
    ToolsCall,
}

impl Method {
    pub const ALL: [Method; 4] = [
        Method::Initialize,
        Method::Initialized,
        Method::ToolsList,
        Method::ToolsCall,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Method::Initialize => "initialize",
            Method::Initialized => "notifications/initialized",
            Method::ToolsList => "tools/list",
            Method::ToolsCall => "tools/call",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    pub fn requires_initialization(&self) -> bool {
        matches!(self, Method::ToolsList | Method::ToolsCall)
    }
}

/// Handshake progress of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Initialized,
}

pub struct McpServer {
    registry: ToolRegistry,
    server_info: ServerInfo,
    state: SessionState,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            state: SessionState::Uninitialized,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one decoded request; notifications yield `None`.
    pub async fn handle(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let method = Method::from_name(&request.method);

        if method == Some(Method::Initialized) {
            tracing::debug!("Client finished initialization");
            return None;
        }

        let Some(id) = request.id.clone() else {
            tracing::debug!("Ignoring notification {}", request.method);
            return None;
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                Some(id),
                JsonRpcError::invalid_request(format!(
                    "Unsupported jsonrpc version '{}'",
                    request.jsonrpc
                )),
            ));
        }

        let Some(method) = method else {
            tracing::debug!("Unknown method {}", request.method);
            return Some(JsonRpcResponse::error(
                Some(id),
                JsonRpcError::method_not_found(&request.method),
            ));
        };

        if method.requires_initialization() && self.state != SessionState::Initialized {
            tracing::debug!("{} called before initialize", method.name());
            return Some(JsonRpcResponse::error(
                Some(id),
                JsonRpcError::internal_error("Server not initialized: call initialize first"),
            ));
        }

        tracing::debug!(method = method.name(), id = ?id, "Handling request");

        let response = match method {
            Method::Initialize => self.initialize(id, request.params),
            Method::ToolsList => self.list_tools(id),
            Method::ToolsCall => self.call_tool(id, request.params).await,
            Method::Initialized => return None,
        };

        Some(response)
    }

    /// Decode one raw message and handle it.
    ///
    /// Undecodable JSON is a parse error; JSON that is not a request is an
    /// invalid request, answered with the id when one can be recovered.
    pub async fn handle_message(&mut self, message: &str) -> Option<JsonRpcResponse> {
        let value: serde_json::Value = match serde_json::from_str(message) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to parse message: {}", e);
                return Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(format!("Parse error: {}", e)),
                ));
            }
        };

        let id = value
            .get("id")
            .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());

        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                tracing::warn!("Invalid request: {}", e);
                Some(JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
                ))
            }
        }
    }

    fn initialize(&mut self, id: RequestId, params: Option<serde_json::Value>) -> JsonRpcResponse {
        match params.map(serde_json::from_value::<InitializeParams>) {
            Some(Ok(params)) => tracing::info!(
                "Initializing session for {} {} (protocol {})",
                params.client_info.name,
                params.client_info.version,
                params.protocol_version
            ),
            _ => tracing::info!("Initializing session"),
        }

        self.state = SessionState::Initialized;

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: self.server_info.clone(),
        };

        JsonRpcResponse::from_serializable(Some(id), &result)
    }

    fn list_tools(&self, id: RequestId) -> JsonRpcResponse {
        let result = ListToolsResult {
            tools: self.registry.list_schemas(),
        };
        JsonRpcResponse::from_serializable(Some(id), &result)
    }

    async fn call_tool(&self, id: RequestId, params: Option<serde_json::Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::error(
                Some(id),
                JsonRpcError::invalid_params("Missing params for tools/call"),
            );
        };

        let params: CallToolParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::error(
                    Some(id),
                    JsonRpcError::invalid_params(format!("Invalid params for tools/call: {}", e)),
                )
            }
        };

        let arguments = params
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Null);

        tracing::debug!("Calling tool {}", params.name);
        let result = self.registry.call(&params.name, arguments).await;

        JsonRpcResponse::from_serializable(Some(id), &result)
    }

    /// Serve requests from `transport` until its input closes.
    pub async fn serve<R, W>(&mut self, mut transport: StdioTransport<R, W>) -> Result<(), TransportError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!("MCP server started with {} tools", self.registry.len());

        loop {
            let message = match transport.next_line().await {
                Ok(Some(message)) => message,
                Ok(None) => break,
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("Skipping unreadable message: {}", e);
                    let error = JsonRpcError::parse_error(format!("Parse error: {}", e));
                    transport.send(&JsonRpcResponse::error(None, error)).await?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if let Some(response) = self.handle_message(&message).await {
                transport.send(&response).await?;
            }
        }

        tracing::info!("Input closed, shutting down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::error_codes;
    use crate::tools::{builtin_registry, ToolContext};
    use sandbox_core::{
        ExecConfig, Executor, HostOnlyPolicy, ProgramCatalog, ScriptCatalog, UpdateStatusReader,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        server: McpServer,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let scripts = dir.path().join("scripts");
        let tools = dir.path().join("tools");
        std::fs::create_dir_all(&scripts).unwrap();
        std::fs::create_dir_all(&tools).unwrap();

        std::fs::write(
            scripts.join("hello.sh"),
            "#!/bin/sh\n# hello.sh\n# Print a greeting\necho hello\n",
        )
        .unwrap();
        std::fs::write(
            scripts.join("init-host-env.sh"),
            format!(
                "#!/bin/sh\n# init-host-env.sh\n# Prepare the host\ntouch {}\n",
                dir.path().join("host-ran").display()
            ),
        )
        .unwrap();

        let ctx = ToolContext {
            scripts: Arc::new(ScriptCatalog::new(&scripts, "sh", HostOnlyPolicy::default())),
            programs: Arc::new(ProgramCatalog::new(&tools, "go")),
            executor: Arc::new(Executor::new(ExecConfig {
                shell: vec!["sh".to_string()],
                ..ExecConfig::default()
            })),
            update_reader: Arc::new(UpdateStatusReader::new(
                dir.path().join("state"),
                dir.path().join("config"),
            )),
        };

        Fixture {
            server: McpServer::new(builtin_registry(&ctx)),
            dir,
        }
    }

    fn request(id: i64, method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest::new(id, method, params)
    }

    async fn initialized() -> Fixture {
        let mut f = fixture();
        f.server
            .handle(request(0, "initialize", json!({})))
            .await
            .unwrap();
        f
    }

    async fn call(server: &mut McpServer, name: &str, arguments: Value) -> Value {
        let response = server
            .handle(request(9, "tools/call", json!({"name": name, "arguments": arguments})))
            .await
            .unwrap();
        assert!(response.error.is_none(), "unexpected protocol error: {:?}", response.error);
        response.result.unwrap()
    }

    #[test]
    fn test_method_names_round_trip() {
        for method in Method::ALL {
            assert_eq!(Method::from_name(method.name()), Some(method));
        }
        assert_eq!(Method::from_name("tools/remove"), None);
    }

    #[tokio::test]
    async fn test_initialize_reports_identity() {
        let mut f = fixture();
        assert_eq!(f.server.state(), SessionState::Uninitialized);

        let response = f
            .server
            .handle(request(1, "initialize", json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "agent", "version": "1.0"}
            })))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], "sandbox-mcp");
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
        assert_eq!(response.id, Some(RequestId::from(1)));
        assert_eq!(f.server.state(), SessionState::Initialized);

        // A repeat initialize is accepted
        let again = f.server.handle(request(2, "initialize", Value::Null)).await.unwrap();
        assert!(again.result.is_some());
    }

    #[tokio::test]
    async fn test_methods_require_initialization() {
        let mut f = fixture();

        for method in ["tools/list", "tools/call"] {
            let response = f
                .server
                .handle(request(1, method, json!({"name": "list_scripts"})))
                .await
                .unwrap();
            assert_eq!(response.error.unwrap().code, error_codes::INTERNAL_ERROR);
            assert!(response.result.is_none());
        }
    }

    #[tokio::test]
    async fn test_initialized_notification_has_no_response() {
        let mut f = fixture();
        assert!(f
            .server
            .handle(JsonRpcRequest::notification("notifications/initialized"))
            .await
            .is_none());
        assert!(f
            .server
            .handle(request(3, "notifications/initialized", Value::Null))
            .await
            .is_none());
        assert!(f
            .server
            .handle(JsonRpcRequest::notification("notifications/cancelled"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let mut f = fixture();
        let response = f.server.handle(request(4, "unknown/method", Value::Null)).await.unwrap();
        assert_eq!(response.error.unwrap().code, error_codes::METHOD_NOT_FOUND);

        let mut f = initialized().await;
        let response = f.server.handle(request(5, "unknown/method", Value::Null)).await.unwrap();
        assert_eq!(response.error.unwrap().code, error_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tools_list_has_seven_tools() {
        let mut f = initialized().await;
        let response = f.server.handle(request(1, "tools/list", Value::Null)).await.unwrap();
        let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();

        let names: Vec<_> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(
            names,
            vec![
                "list_scripts",
                "get_script_info",
                "run_script",
                "list_tools",
                "get_tool_info",
                "run_tool",
                "get_update_status",
            ]
        );
        for tool in &tools {
            assert_eq!(tool["inputSchema"]["type"], "object");
        }
    }

    #[tokio::test]
    async fn test_undecodable_call_params_are_invalid_params() {
        let mut f = initialized().await;

        for params in [json!("run_script"), json!({"arguments": {}}), json!({"name": "x", "arguments": [1]})] {
            let response = f.server.handle(request(1, "tools/call", params)).await.unwrap();
            assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);
        }

        let response = f
            .server
            .handle(JsonRpcRequest {
                params: None,
                ..request(2, "tools/call", Value::Null)
            })
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_missing_required_argument_is_tool_error() {
        let mut f = initialized().await;
        let result = call(&mut f.server, "get_script_info", json!({})).await;
        assert_eq!(result["isError"], true);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_tool_error() {
        let mut f = initialized().await;
        let result = call(&mut f.server, "format_disk", json!({})).await;
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"].as_str().unwrap().contains("format_disk"));
    }

    #[tokio::test]
    async fn test_host_only_script_is_refused_without_spawning() {
        let mut f = initialized().await;
        let result = call(&mut f.server, "run_script", json!({"name": "init-host-env.sh"})).await;

        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("host OS"));
        assert!(!f.dir.path().join("host-ran").exists());
    }

    #[tokio::test]
    async fn test_run_script_success_has_no_is_error() {
        let mut f = initialized().await;
        let result = call(&mut f.server, "run_script", json!({"name": "hello.sh"})).await;

        assert!(result.get("isError").is_none());
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Exit code: 0"));
        assert!(text.contains("hello"));
    }

    #[tokio::test]
    async fn test_list_scripts_reflects_filesystem() {
        let mut f = initialized().await;
        let first = call(&mut f.server, "list_scripts", json!({})).await;
        let second = call(&mut f.server, "list_scripts", json!({})).await;
        assert_eq!(first, second);

        std::fs::write(
            f.dir.path().join("scripts/test-new.sh"),
            "# test-new.sh\n# Newly added\n",
        )
        .unwrap();
        let third = call(&mut f.server, "list_scripts", json!({})).await;
        assert_ne!(first, third);
        assert!(third["content"][0]["text"].as_str().unwrap().contains("test-new.sh"));
    }

    #[tokio::test]
    async fn test_update_status_without_files() {
        let mut f = initialized().await;
        let result = call(&mut f.server, "get_update_status", Value::Null).await;
        assert!(result.get("isError").is_none());
        assert!(result["content"][0]["text"].as_str().unwrap().contains("Last checked: never"));
    }

    #[tokio::test]
    async fn test_handle_message_errors() {
        let mut f = fixture();

        let parse = f.server.handle_message("{not json").await.unwrap();
        assert_eq!(parse.error.unwrap().code, error_codes::PARSE_ERROR);
        assert_eq!(parse.id, None);

        let invalid = f.server.handle_message(r#"{"jsonrpc":"2.0","id":8}"#).await.unwrap();
        assert_eq!(invalid.error.unwrap().code, error_codes::INVALID_REQUEST);
        assert_eq!(invalid.id, Some(RequestId::from(8)));

        let version = f
            .server
            .handle_message(r#"{"jsonrpc":"1.0","id":"v","method":"initialize"}"#)
            .await
            .unwrap();
        assert_eq!(version.error.unwrap().code, error_codes::INVALID_REQUEST);
        assert_eq!(f.server.state(), SessionState::Uninitialized);

        let fractional = f
            .server
            .handle_message(r#"{"jsonrpc":"2.0","id":1.5,"method":"initialize"}"#)
            .await
            .unwrap();
        assert!(fractional.error.is_none());
        assert_eq!(serde_json::to_value(&fractional.id).unwrap(), json!(1.5));
    }

    #[tokio::test]
    async fn test_serve_over_transport() {
        let f = fixture();
        let mut server = f.server;
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n",
        );

        let (mut client, server_io) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_io);
        let transport = StdioTransport::new(server_read, server_write);

        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
        client.write_all(input.as_bytes()).await.unwrap();
        client.shutdown().await.unwrap();

        server.serve(transport).await.unwrap();

        let mut lines = BufReader::new(client).lines();
        let first: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        let second: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();

        assert_eq!(first["id"], 1);
        assert_eq!(first["result"]["serverInfo"]["name"], "sandbox-mcp");
        assert_eq!(second["id"], 2);
        assert_eq!(second["result"]["tools"].as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_serve_continues_after_unreadable_line() {
        let f = fixture();
        let mut server = f.server;

        let (mut client, server_io) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_io);
        let transport = StdioTransport::new(server_read, server_write);

        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
        client.write_all(b"\xff\xfe garbage\n").await.unwrap();
        client
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\"}\n")
            .await
            .unwrap();
        client.shutdown().await.unwrap();

        server.serve(transport).await.unwrap();
        assert_eq!(server.state(), SessionState::Initialized);

        let mut lines = BufReader::new(client).lines();
        let first: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        let second: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();

        assert_eq!(first["id"], Value::Null);
        assert_eq!(first["error"]["code"], error_codes::PARSE_ERROR);
        assert_eq!(second["id"], 1);
        assert_eq!(second["result"]["serverInfo"]["name"], "sandbox-mcp");
    }
}
