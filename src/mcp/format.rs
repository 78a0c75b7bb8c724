//! Formatting helpers shared across handlers and resources.

use rmcp::model::{CallToolResult, Content, ResourceContents};
use serde::Serialize;
use serde_json::json;

use crate::schema_registry::KnownDocumentType;

pub(crate) const APPLICATION_JSON: &str = "application/json";
pub(crate) const TEXT_PLAIN: &str = "text/plain";

/// Serialize a value to JSON, falling back to compact formatting on error.
pub(crate) fn serialize_json<T: Serialize>(value: &T, context_uri: &str) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|error| {
        tracing::warn!(uri = context_uri, %error, "Failed to serialize JSON prettily");
        serde_json::to_string(value).unwrap_or_else(|_| "{}".into())
    })
}

/// Build JSON resource contents.
pub(crate) fn json_resource_contents(uri: &str, text: String) -> ResourceContents {
    ResourceContents::TextResourceContents {
        uri: uri.to_string(),
        mime_type: Some(APPLICATION_JSON.into()),
        text,
        meta: None,
    }
}

/// Build plain-text resource contents.
pub(crate) fn text_resource_contents(uri: &str, text: String) -> ResourceContents {
    ResourceContents::TextResourceContents {
        uri: uri.to_string(),
        mime_type: Some(TEXT_PLAIN.into()),
        text,
        meta: None,
    }
}

/// Wrap text as a successful tool result.
pub(crate) fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

/// Body of the plain-text example resource for `uri`.
pub(crate) fn example_resource_text(uri: &str) -> String {
    format!("This is example content from: {uri}")
}

/// Built-in document types and their extraction schemas.
pub(crate) fn builtin_schemas_payload() -> String {
    let types: Vec<_> = KnownDocumentType::ALL
        .iter()
        .map(|kind| {
            let schema = serde_json::from_str::<serde_json::Value>(kind.builtin_schema())
                .unwrap_or_else(|_| serde_json::Value::String(kind.builtin_schema().into()));
            json!({ "type": kind.as_str(), "schema": schema })
        })
        .collect();
    serialize_json(&json!({ "documentTypes": types }), "schemas://builtin")
}
