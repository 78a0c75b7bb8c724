use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::llm::{LanguageModel, truncate_chars};

const FIELD_TEXT_LIMIT: usize = 2000;
const FIELD_MAX_TOKENS: u32 = 1000;

/// Schema-driven field extraction through the language model.
#[derive(Clone)]
pub struct FieldExtractor {
    llm: Arc<dyn LanguageModel>,
}

impl FieldExtractor {
    /// Create an extractor backed by `llm`.
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Extract the fields described by `schema` from `text`.
    ///
    /// Never fails: any model or parse failure yields `{"error": "<message>"}`.
    pub async fn extract(&self, text: &str, schema: &str) -> Value {
        let prompt = format!(
            "Extract fields from this document and return ONLY a JSON object \
             (no markdown, no explanation).\n\nSchema:\n{schema}\n\nDocument:\n{}\n\nJSON:",
            truncate_chars(text, FIELD_TEXT_LIMIT)
        );

        let answer = match self.llm.complete(&prompt, FIELD_MAX_TOKENS).await {
            Ok(answer) => answer,
            Err(error) => {
                tracing::error!(%error, "Field extraction failed");
                return json!({ "error": error.to_string() });
            }
        };

        match serde_json::from_str::<Map<String, Value>>(json_slice(&answer)) {
            Ok(fields) => Value::Object(fields),
            Err(error) => {
                tracing::warn!(%error, "Field extraction returned invalid JSON");
                json!({ "error": error.to_string() })
            }
        }
    }
}

/// Slice from the first `{` to the last `}`, tolerating fenced code blocks and chatter.
fn json_slice(answer: &str) -> &str {
    let answer = answer.trim();
    match (answer.find('{'), answer.rfind('}')) {
        (Some(start), Some(end)) if end > start => &answer[start..=end],
        _ => answer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, UnavailableModel};
    use async_trait::async_trait;

    struct Reply(&'static str);

    #[async_trait]
    impl LanguageModel for Reply {
        async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
            assert_eq!(max_tokens, 1000);
            assert!(prompt.contains("Schema:\n{\"invoice_number\": \"string\"}"));
            Ok(self.0.to_string())
        }
    }

    const SCHEMA: &str = r#"{"invoice_number": "string"}"#;

    #[tokio::test]
    async fn parses_fenced_json() {
        let extractor = FieldExtractor::new(Arc::new(Reply(
            "```json\n{\"invoice_number\": \"INV-1\"}\n```",
        )));
        let fields = extractor.extract("Invoice INV-1", SCHEMA).await;
        assert_eq!(fields, json!({ "invoice_number": "INV-1" }));
    }

    #[tokio::test]
    async fn tolerates_leading_chatter() {
        let extractor = FieldExtractor::new(Arc::new(Reply(
            "Here you go: {\"invoice_number\": \"INV-2\"} hope that helps",
        )));
        let fields = extractor.extract("Invoice INV-2", SCHEMA).await;
        assert_eq!(fields["invoice_number"], "INV-2");
    }

    #[tokio::test]
    async fn invalid_json_becomes_error_object() {
        let extractor = FieldExtractor::new(Arc::new(Reply("no json at all")));
        let fields = extractor.extract("text", SCHEMA).await;
        assert!(fields["error"].is_string());
    }

    #[tokio::test]
    async fn non_object_json_becomes_error_object() {
        for answer in ["42", "\"INV-3\"", "[1, 2]"] {
            let extractor = FieldExtractor::new(Arc::new(Reply(answer)));
            let fields = extractor.extract("text", SCHEMA).await;
            assert!(fields["error"].is_string(), "{answer} was accepted");
        }
    }

    #[tokio::test]
    async fn model_failure_becomes_error_object() {
        let extractor = FieldExtractor::new(Arc::new(UnavailableModel));
        let fields = extractor.extract("text", SCHEMA).await;
        assert!(
            fields["error"]
                .as_str()
                .is_some_and(|message| message.contains("unavailable"))
        );
    }
}
