//! Prompt catalog.

use serde_json::{Value, json};

/// Name of the only prompt template.
pub(crate) const CODE_REVIEW_PROMPT: &str = "code-review";

/// Body of the code-review prompt for `code`.
pub(crate) fn code_review_text(code: &str) -> String {
    format!("Please review this code:\n\n{code}")
}

/// Result of `prompts/list`.
pub(crate) fn list_prompts_payload() -> Value {
    json!({
        "prompts": [{
            "name": CODE_REVIEW_PROMPT,
            "description": "Review code for best practices",
            "arguments": [{
                "name": "code",
                "description": "Code to review",
                "required": true,
            }],
        }],
    })
}

/// Result of `prompts/get` for the code-review template.
pub(crate) fn code_review_payload(code: &str) -> Value {
    json!({
        "description": "Code review prompt",
        "messages": [{
            "role": "user",
            "content": {
                "type": "text",
                "text": code_review_text(code),
            },
        }],
    })
}
