//! Handlers for `upload_files` and `check_job`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;

use super::parse_arguments;
use crate::app::Services;
use crate::ingest::{DeclaredType, FileDescriptor, IngestError, UploadBatch};
use crate::jobs::{JobManager, JobStatus};
use crate::mcp::format::text_result;

#[derive(Deserialize)]
struct UploadArgs {
    files: Vec<UploadedFile>,
    #[serde(default, rename = "async")]
    run_async: bool,
}

#[derive(Deserialize)]
struct UploadedFile {
    filename: String,
    content: String,
    #[serde(rename = "type")]
    declared: DeclaredType,
}

#[derive(Deserialize)]
struct CheckJobArgs {
    job_id: String,
}

/// Handle `upload_files`, synchronously or as a background job.
pub(crate) async fn handle_upload_files(
    services: &Services,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: UploadArgs = parse_arguments(arguments)?;
    let batch = match decode_batch(args.files) {
        Ok(batch) => batch,
        Err(error) => {
            tracing::warn!(%error, "Rejected upload batch");
            return Ok(text_result(format!("Error uploading files: {error}")));
        }
    };

    if !args.run_async {
        let outcome = services.orchestrator.process(batch).await;
        return Ok(text_result(outcome.summary));
    }

    let job_id = services.jobs.create();
    let orchestrator = services.orchestrator.clone();
    services
        .jobs
        .submit(&job_id, async move {
            let outcome = orchestrator.try_process(batch).await?;
            Ok::<_, anyhow::Error>(outcome.summary)
        })
        .map_err(|error| McpError::internal_error(error.to_string(), None))?;
    tracing::info!(job_id = %job_id, "Upload job submitted");

    Ok(text_result(format!(
        "Job started: {job_id}\nUse check_job tool to get status."
    )))
}

/// Handle `check_job`.
pub(crate) fn handle_check_job(
    jobs: &JobManager,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: CheckJobArgs = parse_arguments(arguments)?;
    let text = match jobs.status(&args.job_id) {
        None => format!("Job not found: {}", args.job_id),
        Some(JobStatus::Completed { result }) => result,
        Some(JobStatus::Failed { error }) => format!("Job failed: {error}"),
        Some(JobStatus::Processing) => "Job status: processing".to_string(),
    };
    Ok(text_result(text))
}

fn decode_batch(files: Vec<UploadedFile>) -> Result<UploadBatch, IngestError> {
    let descriptors = files
        .into_iter()
        .map(|file| {
            let content = STANDARD.decode(file.content.as_bytes()).map_err(|source| {
                IngestError::InvalidContent {
                    filename: file.filename.clone(),
                    source,
                }
            })?;
            Ok(FileDescriptor::new(&file.filename, content, file.declared))
        })
        .collect::<Result<Vec<_>, IngestError>>()?;
    Ok(UploadBatch::new(descriptors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::RawContent;
    use serde_json::json;

    fn text_of(result: &CallToolResult) -> String {
        match &result.content[0].raw {
            RawContent::Text(text) => text.text.clone(),
            other => panic!("unexpected content: {other:?}"),
        }
    }

    fn uploaded(filename: &str, content: &str, declared: DeclaredType) -> UploadedFile {
        UploadedFile {
            filename: filename.into(),
            content: content.into(),
            declared,
        }
    }

    #[test]
    fn decodes_every_file_in_order() {
        let batch = decode_batch(vec![
            uploaded("a.pdf", "ZGF0YQ==", DeclaredType::Pdf),
            uploaded("../b.png", "", DeclaredType::Image),
        ])
        .expect("valid batch");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.files[0].content, b"data");
        assert_eq!(batch.files[1].filename, "b.png");
    }

    #[test]
    fn undecodable_content_names_the_file() {
        let error = decode_batch(vec![
            uploaded("ok.pdf", "ZGF0YQ==", DeclaredType::Pdf),
            uploaded("bad.pdf", "***", DeclaredType::Pdf),
        ])
        .expect_err("invalid base64");
        assert!(error.to_string().starts_with("invalid content for bad.pdf:"));
    }

    #[test]
    fn check_job_reports_each_state() {
        let jobs = JobManager::new(1);
        let check = |id: &str| {
            let result =
                handle_check_job(&jobs, json!({"job_id": id}).as_object().cloned()).expect("check");
            text_of(&result)
        };

        assert_eq!(check("missing"), "Job not found: missing");

        let pending = jobs.create();
        assert_eq!(check(&pending), "Job status: processing");

        let done = jobs.create();
        jobs.complete(&done, "Files: 1 (separate jobs)".into())
            .expect("complete");
        assert_eq!(check(&done), "Files: 1 (separate jobs)");

        let failed = jobs.create();
        jobs.fail(&failed, "disk full".into()).expect("fail");
        assert_eq!(check(&failed), "Job failed: disk full");
    }

    #[test]
    fn upload_arguments_reject_unknown_types() {
        let error = parse_arguments::<UploadArgs>(
            json!({"files": [{"filename": "a", "content": "", "type": "word"}]})
                .as_object()
                .cloned(),
        )
        .err()
        .expect("unknown type rejected");
        assert_eq!(error.code, rmcp::model::ErrorCode::INVALID_PARAMS);
    }
}
