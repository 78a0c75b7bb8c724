//! JSON-RPC 2.0 envelope helpers.

use rmcp::ErrorData as McpError;
use serde_json::{Map, Value, json};

/// JSON-RPC protocol version literal.
pub const JSONRPC_VERSION: &str = "2.0";

/// Normalize a request identifier for echoing.
///
/// Whole-valued floating point numbers become integers; every other shape passes through.
pub fn normalize_id(id: Value) -> Value {
    match &id {
        Value::Number(number) if number.is_f64() => match number.as_f64() {
            Some(value)
                if value.fract() == 0.0
                    && value >= i64::MIN as f64
                    && value <= i64::MAX as f64 =>
            {
                Value::from(value as i64)
            }
            _ => id,
        },
        _ => id,
    }
}

/// Whether a request object is a notification (no `id`, or a null `id`).
pub fn is_notification(request: &Map<String, Value>) -> bool {
    matches!(request.get("id"), None | Some(Value::Null))
}

/// Build a success response.
pub fn success(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "result": result,
    })
}

/// Build an error response. The `id` is omitted when the request could not be identified.
pub fn failure(id: Option<Value>, error: &McpError) -> Value {
    let mut body = Map::new();
    body.insert("code".into(), Value::from(error.code.0));
    body.insert("message".into(), Value::String(error.message.to_string()));
    if let Some(data) = error.data.clone() {
        body.insert("data".into(), data);
    }

    let mut response = Map::new();
    response.insert("jsonrpc".into(), Value::String(JSONRPC_VERSION.into()));
    if let Some(id) = id {
        response.insert("id".into(), id);
    }
    response.insert("error".into(), Value::Object(body));
    Value::Object(response)
}
