//! Handlers for the catalog tools: `echo`, `list_resources`, `read_resource`, `get_prompt`.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;

use super::parse_arguments;
use crate::mcp::format::{example_resource_text, text_result};
use crate::mcp::prompts::{CODE_REVIEW_PROMPT, code_review_text};
use crate::mcp::server::{BUILTIN_SCHEMAS_URI, EXAMPLE_URI};

#[derive(Deserialize)]
struct EchoArgs {
    text: String,
}

#[derive(Deserialize)]
struct ReadResourceArgs {
    uri: String,
}

#[derive(Deserialize)]
struct GetPromptArgs {
    name: String,
    code: String,
}

/// Handle `echo`.
pub(crate) fn handle_echo(arguments: Option<JsonObject>) -> Result<CallToolResult, McpError> {
    let args: EchoArgs = parse_arguments(arguments)?;
    Ok(text_result(format!("Echo: {}", args.text)))
}

/// Handle `list_resources`: the resource catalog rendered as text.
pub(crate) fn handle_list_resources() -> Result<CallToolResult, McpError> {
    Ok(text_result(format!(
        "Available resources:\n- {EXAMPLE_URI} (Example File) - An example text resource\n- {BUILTIN_SCHEMAS_URI} (Built-in Schemas) - Known document types and their extraction schemas"
    )))
}

/// Handle `read_resource` for any URI.
pub(crate) fn handle_read_resource(
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: ReadResourceArgs = parse_arguments(arguments)?;
    Ok(text_result(format!(
        "Content of {}:\n{}",
        args.uri,
        example_resource_text(&args.uri)
    )))
}

/// Handle `get_prompt`.
pub(crate) fn handle_get_prompt(arguments: Option<JsonObject>) -> Result<CallToolResult, McpError> {
    let args: GetPromptArgs = parse_arguments(arguments)?;
    if args.name != CODE_REVIEW_PROMPT {
        return Err(McpError::invalid_params(
            format!("Unknown prompt: {}", args.name),
            None,
        ));
    }
    Ok(text_result(format!(
        "Code Review Prompt:\n{}",
        code_review_text(&args.code)
    )))
}
