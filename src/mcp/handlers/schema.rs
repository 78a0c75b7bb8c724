//! Handlers for the schema registry tools.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;

use super::parse_arguments;
use crate::mcp::format::text_result;
use crate::schema_registry::SchemaRegistry;

#[derive(Deserialize)]
struct AddSchemaArgs {
    doc_type: String,
    schema: String,
}

#[derive(Deserialize)]
struct GetSchemaArgs {
    doc_type: String,
}

/// Handle `add_schema`: register or replace a custom schema.
pub(crate) fn handle_add_schema(
    schemas: &SchemaRegistry,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: AddSchemaArgs = parse_arguments(arguments)?;
    let message = format!("Schema added for: {}", args.doc_type);
    schemas.add(args.doc_type, args.schema);
    Ok(text_result(message))
}

/// Handle `list_schemas`: custom entries only, sorted by type.
pub(crate) fn handle_list_schemas(schemas: &SchemaRegistry) -> Result<CallToolResult, McpError> {
    let custom = schemas.list();
    if custom.is_empty() {
        return Ok(text_result(
            "No custom schemas defined. Using built-in schemas.",
        ));
    }

    let mut text = String::from("Custom schemas:\n");
    for doc_type in custom.keys() {
        text.push_str("- ");
        text.push_str(doc_type);
        text.push('\n');
    }
    Ok(text_result(text))
}

/// Handle `get_schema`: custom, then built-in, then `{}`.
pub(crate) fn handle_get_schema(
    schemas: &SchemaRegistry,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: GetSchemaArgs = parse_arguments(arguments)?;
    let schema = schemas.get(&args.doc_type);
    Ok(text_result(format!(
        "Schema for {}:\n{schema}",
        args.doc_type
    )))
}
