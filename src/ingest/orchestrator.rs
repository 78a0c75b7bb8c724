use std::path::Path;
use std::sync::Arc;

use serde_json::{Value, json};
use uuid::Uuid;

use super::storage::{JobStore, upload_timestamp};
use super::types::{
    DeclaredType, FileDescriptor, FileRecord, IngestError, JobKind, JobMetadata, Topology,
    UploadBatch, UploadOutcome,
};
use crate::archive::ArchiveDispatcher;
use crate::classification::{DocumentClassifier, EntityDetector};
use crate::extraction::markdown::{document_markdown, spreadsheet_markdown};
use crate::extraction::{DocumentAnalyzer, ExtractionError, FieldExtractor, SpreadsheetReader};
use crate::llm::LanguageModel;
use crate::metrics::IntakeMetrics;
use crate::schema_registry::SchemaRegistry;

/// External collaborators the orchestrator delegates to.
#[derive(Clone)]
pub struct Collaborators {
    /// OCR/document analysis service.
    pub analyzer: Arc<dyn DocumentAnalyzer>,
    /// Spreadsheet decoder.
    pub spreadsheets: Arc<dyn SpreadsheetReader>,
    /// Entity detection service.
    pub entities: Arc<dyn EntityDetector>,
    /// Language model for classification and field extraction.
    pub llm: Arc<dyn LanguageModel>,
}

/// Turns an upload batch into job folders, metadata records, and a summary.
pub struct UploadOrchestrator {
    store: JobStore,
    analyzer: Arc<dyn DocumentAnalyzer>,
    spreadsheets: Arc<dyn SpreadsheetReader>,
    classifier: DocumentClassifier,
    fields: FieldExtractor,
    schemas: Arc<SchemaRegistry>,
    metrics: Arc<IntakeMetrics>,
}

/// Output of either extraction path.
struct Extracted {
    text: String,
    structured_data: Value,
    markdown: String,
    ocr_confidence: Option<f32>,
}

impl Extracted {
    fn apply(self, record: &mut FileRecord) {
        record.extracted_text = Some(self.text);
        record.structured_data = Some(self.structured_data);
        record.markdown = Some(self.markdown);
        record.ocr_confidence = self.ocr_confidence;
    }
}

impl UploadOrchestrator {
    /// Wire an orchestrator over a job store and its collaborators.
    pub fn new(
        store: JobStore,
        collaborators: Collaborators,
        schemas: Arc<SchemaRegistry>,
        metrics: Arc<IntakeMetrics>,
    ) -> Self {
        Self {
            store,
            analyzer: collaborators.analyzer,
            spreadsheets: collaborators.spreadsheets,
            classifier: DocumentClassifier::new(collaborators.entities, collaborators.llm.clone()),
            fields: FieldExtractor::new(collaborators.llm),
            schemas,
            metrics,
        }
    }

    /// Process one batch. Never fails: per-file errors land in the file's record and summary
    /// line, and a failure that escapes them becomes an `Error uploading files:` summary.
    pub async fn process(&self, batch: UploadBatch) -> UploadOutcome {
        self.try_process(batch).await.unwrap_or_else(|error| {
            tracing::error!(%error, "Upload pass aborted");
            UploadOutcome {
                summary: format!("Error uploading files: {error}"),
                job_folders: Vec::new(),
            }
        })
    }

    /// Process one batch, surfacing a pass-aborting storage failure as an error.
    pub async fn try_process(&self, batch: UploadBatch) -> Result<UploadOutcome, IngestError> {
        let topology = batch.topology();
        tracing::info!(files = batch.len(), ?topology, "Processing upload batch");

        match topology {
            Topology::Archive => self.process_archive_batch(batch).await,
            Topology::Standalone => self.process_standalone_batch(batch).await,
        }
    }

    async fn process_archive_batch(
        &self,
        batch: UploadBatch,
    ) -> Result<UploadOutcome, IngestError> {
        let job_id = Uuid::new_v4().to_string();
        let folder = self.store.create_job_folder(&job_id).await?;

        let mut summary = format!(
            "Job ID: {job_id} (archive extraction)\nFiles: {}\n\n",
            batch.len()
        );
        let mut records = Vec::with_capacity(batch.len());
        for file in batch.files {
            let record = self.process_archive_member(&folder, file).await;
            summary.push_str(&archive_batch_line(&record));
            records.push(record);
        }
        summary.push_str(&format!("\nPath: {}", folder.display()));

        let metadata = JobMetadata {
            job_id,
            kind: JobKind::Archive,
            upload_time: upload_timestamp(),
            file_count: records.len(),
            path: folder.display().to_string(),
            files: records,
        };
        self.persist(&folder, &metadata).await;

        Ok(UploadOutcome {
            summary,
            job_folders: vec![folder],
        })
    }

    async fn process_standalone_batch(
        &self,
        batch: UploadBatch,
    ) -> Result<UploadOutcome, IngestError> {
        let mut summary = format!("Files: {} (separate jobs)\n\n", batch.len());
        let mut job_folders = Vec::with_capacity(batch.len());

        for file in batch.files {
            let job_id = Uuid::new_v4().to_string();
            let folder = self.store.create_job_folder(&job_id).await?;
            let record = self.process_standalone_file(&folder, file).await;
            summary.push_str(&standalone_entry(&job_id, &record));

            let metadata = JobMetadata {
                job_id,
                kind: JobKind::Single,
                upload_time: upload_timestamp(),
                file_count: 1,
                path: folder.display().to_string(),
                files: vec![record],
            };
            self.persist(&folder, &metadata).await;
            job_folders.push(folder);
        }

        Ok(UploadOutcome {
            summary,
            job_folders,
        })
    }

    /// Archive-batch member: stored and either unpacked or extracted, never classified.
    async fn process_archive_member(&self, folder: &Path, file: FileDescriptor) -> FileRecord {
        let mut record = FileRecord::new(&file);
        log_received(&file);

        let stored = match self
            .store
            .write_file(folder, &file.filename, &file.content)
            .await
        {
            Ok(path) => path,
            Err(error) => {
                self.fail(&mut record, format!("failed to store file: {error}"));
                return record;
            }
        };

        if file.declared == DeclaredType::Archive {
            let dest = folder.to_path_buf();
            let extraction = tokio::task::spawn_blocking(move || {
                ArchiveDispatcher::new().extract(&stored, &dest)
            })
            .await;
            match extraction {
                Ok(count) => {
                    self.metrics.record_archive_entries(count as u64);
                    self.metrics.record_file();
                    record.extracted_entries = Some(count);
                }
                Err(error) => self.fail(&mut record, format!("archive task failed: {error}")),
            }
            return record;
        }

        match self.extract(&file).await {
            Ok(extracted) => {
                extracted.apply(&mut record);
                self.metrics.record_file();
            }
            Err(error) => self.fail(&mut record, error.to_string()),
        }
        record
    }

    /// Standalone file: stored, extracted, classified, and field-extracted.
    async fn process_standalone_file(&self, folder: &Path, file: FileDescriptor) -> FileRecord {
        let mut record = FileRecord::new(&file);
        log_received(&file);

        if let Err(error) = self
            .store
            .write_file(folder, &file.filename, &file.content)
            .await
        {
            self.fail(&mut record, format!("failed to store file: {error}"));
            return record;
        }

        let extracted = match self.extract(&file).await {
            Ok(extracted) => extracted,
            Err(error) => {
                self.fail(&mut record, error.to_string());
                return record;
            }
        };
        let text = extracted.text.clone();
        extracted.apply(&mut record);

        let classification = self.classifier.classify(&text).await;
        let verdict = classification.consensus();
        let schema = self.schemas.get(&verdict.label);
        let fields = self.fields.extract(&text, &schema).await;

        tracing::info!(
            filename = %file.filename,
            doc_type = %verdict.label,
            confidence = verdict.confidence,
            method = ?verdict.method,
            "Document classified"
        );

        record.classification = Some(classification);
        record.final_classification = Some(verdict);
        record.extracted_fields = Some(fields);
        self.metrics.record_file();
        record
    }

    async fn extract(&self, file: &FileDescriptor) -> Result<Extracted, ExtractionError> {
        if file.is_spreadsheet() {
            let reader = Arc::clone(&self.spreadsheets);
            let content = file.content.clone();
            let workbook = tokio::task::spawn_blocking(move || reader.read(&content))
                .await
                .map_err(|error| {
                    ExtractionError::Failed(format!("spreadsheet task failed: {error}"))
                })??;
            let structured_data = serde_json::to_value(&workbook)
                .map_err(|error| ExtractionError::Failed(error.to_string()))?;
            return Ok(Extracted {
                text: workbook.raw_text(),
                markdown: spreadsheet_markdown(&workbook),
                structured_data,
                ocr_confidence: None,
            });
        }

        let analysis = self
            .analyzer
            .analyze(&file.filename, &file.content)
            .await?;
        Ok(Extracted {
            markdown: document_markdown(&analysis.text, &analysis.key_values),
            structured_data: json!({
                "tables": analysis.tables,
                "keyValues": analysis.key_values,
            }),
            ocr_confidence: analysis.confidence,
            text: analysis.text,
        })
    }

    fn fail(&self, record: &mut FileRecord, error: String) {
        tracing::warn!(filename = %record.filename, %error, "File processing failed");
        self.metrics.record_failed_file();
        record.error = Some(error);
    }

    async fn persist(&self, folder: &Path, metadata: &JobMetadata) {
        match self.store.write_metadata(folder, metadata).await {
            Ok(path) => {
                self.metrics.record_job();
                tracing::info!(
                    job_id = %metadata.job_id,
                    files = metadata.file_count,
                    path = %path.display(),
                    "Job metadata written"
                );
            }
            Err(error) => {
                tracing::error!(job_id = %metadata.job_id, %error, "Failed to write job metadata");
            }
        }
    }
}

fn log_received(file: &FileDescriptor) {
    tracing::info!(
        filename = %file.filename,
        declared = file.declared.as_str(),
        detected = %file.detected,
        bytes = file.content.len(),
        "File received"
    );
}

fn archive_batch_line(record: &FileRecord) -> String {
    let declared = record.declared_type.as_str();
    match (&record.error, record.extracted_entries) {
        (Some(error), _) => format!("✗ {} ({declared}) - error: {error}\n", record.filename),
        (None, Some(count)) => format!(
            "✓ {} (archive) - {} bytes - extracted {count} files\n",
            record.filename, record.size
        ),
        (None, None) => format!(
            "✓ {} ({declared}) - {} bytes\n",
            record.filename, record.size
        ),
    }
}

fn standalone_entry(job_id: &str, record: &FileRecord) -> String {
    let declared = record.declared_type.as_str();
    match &record.error {
        Some(error) => format!(
            "✗ {} ({declared})\n  Job ID: {job_id}\n  Error: {error}\n\n",
            record.filename
        ),
        None => format!(
            "✓ {} ({declared})\n  Job ID: {job_id}\n  Size: {} bytes\n\n",
            record.filename, record.size
        ),
    }
}
