//! JSON schema builders for tool inputs.

use serde_json::{Map, Value};

use crate::ingest::DeclaredType;

/// Schema for `echo`.
pub(crate) fn echo_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("text".into(), string_schema("Text to echo"));
    finalize_object_schema(properties, &["text"])
}

/// Schema for `upload_files`.
pub(crate) fn upload_files_input_schema() -> Map<String, Value> {
    let mut file_properties = Map::new();
    file_properties.insert("filename".into(), string_schema("File name"));
    file_properties.insert("content".into(), string_schema("Base64 encoded content"));

    let mut type_schema = Map::new();
    type_schema.insert("type".into(), Value::String("string".into()));
    type_schema.insert(
        "enum".into(),
        Value::Array(
            [
                DeclaredType::Pdf,
                DeclaredType::Excel,
                DeclaredType::Image,
                DeclaredType::Archive,
            ]
            .into_iter()
            .map(|variant| Value::String(variant.as_str().into()))
            .collect(),
        ),
    );
    type_schema.insert("description".into(), Value::String("File type".into()));
    file_properties.insert("type".into(), Value::Object(type_schema));

    let mut files_schema = Map::new();
    files_schema.insert("type".into(), Value::String("array".into()));
    files_schema.insert(
        "description".into(),
        Value::String("Array of files to upload".into()),
    );
    files_schema.insert(
        "items".into(),
        Value::Object(finalize_object_schema(
            file_properties,
            &["filename", "content", "type"],
        )),
    );

    let mut async_schema = Map::new();
    async_schema.insert("type".into(), Value::String("boolean".into()));
    async_schema.insert(
        "description".into(),
        Value::String("Process asynchronously (returns job ID)".into()),
    );
    async_schema.insert("default".into(), Value::Bool(false));

    let mut properties = Map::new();
    properties.insert("files".into(), Value::Object(files_schema));
    properties.insert("async".into(), Value::Object(async_schema));
    finalize_object_schema(properties, &["files"])
}

/// Schema for `check_job`.
pub(crate) fn check_job_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("job_id".into(), string_schema("Job ID from async upload"));
    finalize_object_schema(properties, &["job_id"])
}

/// Schema for `add_schema`.
pub(crate) fn add_schema_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "doc_type".into(),
        string_schema("Document type (e.g., CUSTOM_INVOICE)"),
    );
    properties.insert(
        "schema".into(),
        string_schema("JSON schema for field extraction"),
    );
    finalize_object_schema(properties, &["doc_type", "schema"])
}

/// Schema for `get_schema`.
pub(crate) fn get_schema_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("doc_type".into(), string_schema("Document type"));
    finalize_object_schema(properties, &["doc_type"])
}

/// Schema for `read_resource`.
pub(crate) fn read_resource_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "uri".into(),
        string_schema("Resource URI (e.g., file:///example.txt)"),
    );
    finalize_object_schema(properties, &["uri"])
}

/// Schema for `get_prompt`.
pub(crate) fn get_prompt_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("name".into(), string_schema("Prompt name"));
    properties.insert("code".into(), string_schema("Code to review"));
    finalize_object_schema(properties, &["name", "code"])
}

/// Schema for tools without inputs.
pub(crate) fn empty_object_schema() -> Map<String, Value> {
    finalize_object_schema(Map::new(), &[])
}

fn string_schema(description: &str) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("string".into()));
    schema.insert("description".into(), Value::String(description.into()));
    Value::Object(schema)
}

fn finalize_object_schema(properties: Map<String, Value>, required: &[&str]) -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert(
            "required".into(),
            Value::Array(
                required
                    .iter()
                    .map(|&key| Value::String(key.into()))
                    .collect(),
            ),
        );
    }
    schema.insert("additionalProperties".into(), Value::Bool(false));
    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_schema_enumerates_declared_types() {
        let schema = upload_files_input_schema();
        let item = &schema["properties"]["files"]["items"];
        assert_eq!(
            item["properties"]["type"]["enum"],
            serde_json::json!(["pdf", "excel", "image", "archive"])
        );
        assert_eq!(item["required"], serde_json::json!(["filename", "content", "type"]));
        assert_eq!(schema["required"], serde_json::json!(["files"]));
    }

    #[test]
    fn empty_schema_has_no_required_list() {
        let schema = empty_object_schema();
        assert_eq!(schema["type"], "object");
        assert!(schema.get("required").is_none());
    }
}
