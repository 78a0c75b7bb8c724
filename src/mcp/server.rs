//! MCP method dispatch and the tool and resource catalogs.

use std::{borrow::Cow, sync::Arc};

use rmcp::{
    ErrorData as McpError,
    model::{
        AnnotateAble, CallToolRequestParam, CallToolResult, ErrorCode, Implementation, JsonObject,
        ListResourcesResult, ListToolsResult, RawResource, ReadResourceRequestParam,
        ReadResourceResult, Resource, ServerCapabilities, Tool, ToolAnnotations,
    },
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{
    PROTOCOL_VERSION,
    format::{
        APPLICATION_JSON, TEXT_PLAIN, builtin_schemas_payload, example_resource_text,
        json_resource_contents, text_resource_contents, text_result,
    },
    handlers::{catalog, parse_arguments_value, schema, upload},
    prompts::{CODE_REVIEW_PROMPT, code_review_payload, list_prompts_payload},
    registry, schemas,
};
use crate::app::Services;

pub(crate) const EXAMPLE_URI: &str = "file:///example.txt";
pub(crate) const BUILTIN_SCHEMAS_URI: &str = "schemas://builtin";

/// Successful dispatch output.
#[derive(Debug, Clone)]
pub struct Reply {
    /// JSON-RPC `result` member.
    pub result: Value,
    /// Session minted by a successful `initialize`.
    pub session_id: Option<String>,
}

impl Reply {
    fn plain(result: Value) -> Self {
        Self {
            result,
            session_id: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeParams {
    #[serde(default)]
    protocol_version: Option<String>,
}

#[derive(Deserialize)]
struct GetPromptParams {
    name: String,
    #[serde(default)]
    arguments: JsonObject,
}

/// MCP server exposing the intake tools, resources, and prompts.
#[derive(Clone)]
pub struct IntakeMcpServer {
    services: Services,
    registry: Arc<registry::Registry>,
}

impl IntakeMcpServer {
    /// Create a server over the supplied services.
    pub fn new(services: Services) -> Self {
        let mut registry = registry::Registry::new();
        registry.register_resource(EXAMPLE_URI, resource_example);
        registry.register_resource(BUILTIN_SCHEMAS_URI, resource_builtin_schemas);

        registry.register_tool("echo", tool_echo);
        registry.register_tool("upload_files", tool_upload_files);
        registry.register_tool("check_job", tool_check_job);
        registry.register_tool("add_schema", tool_add_schema);
        registry.register_tool("list_schemas", tool_list_schemas);
        registry.register_tool("get_schema", tool_get_schema);
        registry.register_tool("list_resources", tool_list_resources);
        registry.register_tool("read_resource", tool_read_resource);
        registry.register_tool("get_prompt", tool_get_prompt);

        Self {
            services,
            registry: Arc::new(registry),
        }
    }

    /// Shared service handles.
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Execute one JSON-RPC method and return its `result` member.
    pub async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Reply, McpError> {
        tracing::debug!(method, "Dispatching request");
        match method {
            "initialize" => self.initialize(params),
            "tools/list" => {
                to_result(&ListToolsResult::with_all_items(self.describe_tools())).map(Reply::plain)
            }
            "tools/call" => {
                let request: CallToolRequestParam =
                    parse_arguments_value(params.unwrap_or(Value::Null))?;
                let result = self.call_tool(request).await?;
                to_result(&result).map(Reply::plain)
            }
            "resources/list" => {
                to_result(&ListResourcesResult::with_all_items(self.describe_resources()))
                    .map(Reply::plain)
            }
            "resources/read" => {
                let request: ReadResourceRequestParam =
                    parse_arguments_value(params.unwrap_or(Value::Null))?;
                let result = self.read_resource(request).await?;
                to_result(&result).map(Reply::plain)
            }
            "prompts/list" => Ok(Reply::plain(list_prompts_payload())),
            "prompts/get" => {
                let request: GetPromptParams =
                    parse_arguments_value(params.unwrap_or(Value::Null))?;
                get_prompt(request).map(Reply::plain)
            }
            other => Err(McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
                None,
            )),
        }
    }

    fn initialize(&self, params: Option<Value>) -> Result<Reply, McpError> {
        let requested = match params {
            Some(value) => parse_arguments_value::<InitializeParams>(value)?.protocol_version,
            None => None,
        };
        let protocol_version = requested.unwrap_or_else(|| PROTOCOL_VERSION.to_string());

        let capabilities = ServerCapabilities::builder()
            .enable_prompts()
            .enable_resources()
            .enable_tools()
            .build();
        let result = json!({
            "protocolVersion": protocol_version,
            "capabilities": to_result(&capabilities)?,
            "serverInfo": to_result(&server_implementation())?,
        });

        let session_id = self.services.sessions.create();
        tracing::info!(session_id = %session_id, %protocol_version, "Client initialized");
        Ok(Reply {
            result,
            session_id: Some(session_id),
        })
    }

    async fn call_tool(&self, request: CallToolRequestParam) -> Result<CallToolResult, McpError> {
        if let Some(handler) = self.registry.tools.get(request.name.as_ref()) {
            return handler(self, request).await;
        }
        tracing::warn!(tool = %request.name, "Unknown tool requested");
        Ok(text_result(format!("Unknown tool: {}", request.name)))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
    ) -> Result<ReadResourceResult, McpError> {
        if let Some(handler) = self.registry.resources.get(request.uri.as_str()) {
            return handler(self, request).await;
        }
        Ok(ReadResourceResult {
            contents: vec![text_resource_contents(
                &request.uri,
                example_resource_text(&request.uri),
            )],
        })
    }

    fn describe_tools(&self) -> Vec<Tool> {
        vec![
            tool(
                "echo",
                "Echo",
                "Echoes back the input text",
                schemas::echo_input_schema(),
                ToolAnnotations::with_title("Echo")
                    .read_only(true)
                    .idempotent(true)
                    .open_world(false),
            ),
            tool(
                "upload_files",
                "Upload Files",
                "Upload multiple files (PDF, Excel, Image, or Archive). Supports async processing. Returns structured JSON, markdown, and classification.",
                schemas::upload_files_input_schema(),
                ToolAnnotations::with_title("Upload Files")
                    .destructive(false)
                    .idempotent(false)
                    .open_world(true),
            ),
            tool(
                "check_job",
                "Check Job",
                "Check status of async job",
                schemas::check_job_input_schema(),
                ToolAnnotations::with_title("Check Job")
                    .read_only(true)
                    .idempotent(true)
                    .open_world(false),
            ),
            tool(
                "add_schema",
                "Add Schema",
                "Add custom extraction schema for a document type",
                schemas::add_schema_input_schema(),
                ToolAnnotations::with_title("Add Schema")
                    .destructive(true)
                    .idempotent(true)
                    .open_world(false),
            ),
            tool(
                "list_schemas",
                "List Schemas",
                "List all custom schemas",
                schemas::empty_object_schema(),
                ToolAnnotations::with_title("List Schemas")
                    .read_only(true)
                    .idempotent(true)
                    .open_world(false),
            ),
            tool(
                "get_schema",
                "Get Schema",
                "Get schema for a document type",
                schemas::get_schema_input_schema(),
                ToolAnnotations::with_title("Get Schema")
                    .read_only(true)
                    .idempotent(true)
                    .open_world(false),
            ),
            tool(
                "list_resources",
                "List Resources",
                "List all available resources",
                schemas::empty_object_schema(),
                ToolAnnotations::with_title("List Resources")
                    .read_only(true)
                    .idempotent(true)
                    .open_world(false),
            ),
            tool(
                "read_resource",
                "Read Resource",
                "Read a resource by URI",
                schemas::read_resource_input_schema(),
                ToolAnnotations::with_title("Read Resource")
                    .read_only(true)
                    .idempotent(true)
                    .open_world(false),
            ),
            tool(
                "get_prompt",
                "Get Prompt",
                "Get a prompt template (code-review)",
                schemas::get_prompt_input_schema(),
                ToolAnnotations::with_title("Get Prompt")
                    .read_only(true)
                    .idempotent(true)
                    .open_world(false),
            ),
        ]
    }

    fn describe_resources(&self) -> Vec<Resource> {
        let mut example = RawResource::new(EXAMPLE_URI, "Example File");
        example.description = Some("An example text resource".into());
        example.mime_type = Some(TEXT_PLAIN.into());

        let mut builtin = RawResource::new(BUILTIN_SCHEMAS_URI, "Built-in Schemas");
        builtin.description = Some("Known document types and their extraction schemas".into());
        builtin.mime_type = Some(APPLICATION_JSON.into());

        vec![example.no_annotation(), builtin.no_annotation()]
    }
}

fn tool(
    name: &'static str,
    title: &str,
    description: &'static str,
    input_schema: JsonObject,
    annotations: ToolAnnotations,
) -> Tool {
    Tool {
        name: Cow::Borrowed(name),
        title: Some(title.to_string()),
        description: Some(Cow::Borrowed(description)),
        input_schema: Arc::new(input_schema),
        output_schema: None,
        annotations: Some(annotations),
        icons: None,
    }
}

fn server_implementation() -> Implementation {
    let mut implementation = Implementation::from_build_env();
    implementation.name = "intakemcp".to_string();
    implementation.title = Some("Document Intake MCP".to_string());
    implementation.version = env!("CARGO_PKG_VERSION").to_string();
    implementation
}

fn get_prompt(request: GetPromptParams) -> Result<Value, McpError> {
    if request.name != CODE_REVIEW_PROMPT {
        return Err(McpError::invalid_params(
            format!("Unknown prompt: {}", request.name),
            None,
        ));
    }
    let code = request
        .arguments
        .get("code")
        .and_then(Value::as_str)
        .ok_or_else(|| McpError::invalid_params("Missing required argument: code", None))?;
    Ok(code_review_payload(code))
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, McpError> {
    serde_json::to_value(value).map_err(|err| McpError::internal_error(err.to_string(), None))
}

fn resource_example(
    _server: &IntakeMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    Box::pin(async move {
        Ok(ReadResourceResult {
            contents: vec![text_resource_contents(
                EXAMPLE_URI,
                example_resource_text(EXAMPLE_URI),
            )],
        })
    })
}

fn resource_builtin_schemas(
    _server: &IntakeMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    Box::pin(async move {
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                BUILTIN_SCHEMAS_URI,
                builtin_schemas_payload(),
            )],
        })
    })
}

fn tool_echo(_server: &IntakeMcpServer, request: CallToolRequestParam) -> registry::ToolFuture {
    Box::pin(async move { catalog::handle_echo(request.arguments) })
}

fn tool_upload_files(
    server: &IntakeMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let services = server.services.clone();
    Box::pin(async move { upload::handle_upload_files(&services, request.arguments).await })
}

fn tool_check_job(server: &IntakeMcpServer, request: CallToolRequestParam) -> registry::ToolFuture {
    let jobs = server.services.jobs.clone();
    Box::pin(async move { upload::handle_check_job(&jobs, request.arguments) })
}

fn tool_add_schema(
    server: &IntakeMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let schemas = server.services.schemas.clone();
    Box::pin(async move { schema::handle_add_schema(&schemas, request.arguments) })
}

fn tool_list_schemas(
    server: &IntakeMcpServer,
    _request: CallToolRequestParam,
) -> registry::ToolFuture {
    let schemas = server.services.schemas.clone();
    Box::pin(async move { schema::handle_list_schemas(&schemas) })
}

fn tool_get_schema(
    server: &IntakeMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let schemas = server.services.schemas.clone();
    Box::pin(async move { schema::handle_get_schema(&schemas, request.arguments) })
}

fn tool_list_resources(
    _server: &IntakeMcpServer,
    _request: CallToolRequestParam,
) -> registry::ToolFuture {
    Box::pin(async move { catalog::handle_list_resources() })
}

fn tool_read_resource(
    _server: &IntakeMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    Box::pin(async move { catalog::handle_read_resource(request.arguments) })
}

fn tool_get_prompt(
    _server: &IntakeMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    Box::pin(async move { catalog::handle_get_prompt(request.arguments) })
}
