//! Tool handlers for the MCP server.

use rmcp::{ErrorData as McpError, model::JsonObject};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub(crate) mod catalog;
pub(crate) mod schema;
pub(crate) mod upload;

/// Parse structured arguments supplied to a tool invocation.
pub(crate) fn parse_arguments<T: DeserializeOwned>(
    arguments: Option<JsonObject>,
) -> Result<T, McpError> {
    let value = arguments
        .map(Value::Object)
        .unwrap_or_else(|| Value::Object(JsonObject::new()));
    parse_arguments_value(value)
}

/// Deserialize arguments represented as a JSON value into the target type.
pub(crate) fn parse_arguments_value<T: DeserializeOwned>(value: Value) -> Result<T, McpError> {
    serde_json::from_value(value)
        .map_err(|err| McpError::invalid_params(format!("Invalid arguments: {err}"), None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Args {
        uri: String,
    }

    #[test]
    fn parses_present_arguments() {
        let arguments = json!({"uri": "file:///a.txt"});
        let args: Args =
            parse_arguments(arguments.as_object().cloned()).expect("arguments parse");
        assert_eq!(args.uri, "file:///a.txt");
    }

    #[test]
    fn missing_fields_are_invalid_params() {
        let error = parse_arguments::<Args>(None).expect_err("missing uri");
        assert_eq!(error.code, rmcp::model::ErrorCode::INVALID_PARAMS);
        assert!(error.message.starts_with("Invalid arguments:"));
    }
}
