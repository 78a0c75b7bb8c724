use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::detect::{ContentKind, detect_content, sanitize_filename};
use crate::classification::{Classification, Verdict};

/// Client-asserted file type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredType {
    /// PDF document.
    Pdf,
    /// Spreadsheet workbook.
    Excel,
    /// Scanned image.
    Image,
    /// ZIP or TAR container.
    Archive,
}

impl DeclaredType {
    /// Wire label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Excel => "excel",
            Self::Image => "image",
            Self::Archive => "archive",
        }
    }
}

/// One decoded upload.
#[derive(Clone, Debug)]
pub struct FileDescriptor {
    /// Sanitised filename (final path component only).
    pub filename: String,
    /// Raw content bytes.
    pub content: Vec<u8>,
    /// Type asserted by the client.
    pub declared: DeclaredType,
    /// Type sniffed from the content; advisory only.
    pub detected: ContentKind,
}

impl FileDescriptor {
    /// Build a descriptor, sanitising the filename and sniffing the content type.
    pub fn new(filename: &str, content: Vec<u8>, declared: DeclaredType) -> Self {
        let filename = sanitize_filename(filename);
        let detected = detect_content(&content, &filename);
        Self {
            filename,
            content,
            declared,
            detected,
        }
    }

    /// Whether the spreadsheet extraction path applies.
    pub fn is_spreadsheet(&self) -> bool {
        self.declared == DeclaredType::Excel || self.detected == ContentKind::Excel
    }
}

/// How a batch maps onto job folders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    /// At least one archive: every file shares one job.
    Archive,
    /// No archives: one job per file.
    Standalone,
}

/// Ordered set of files submitted together.
#[derive(Clone, Debug, Default)]
pub struct UploadBatch {
    /// Files in submission order.
    pub files: Vec<FileDescriptor>,
}

impl UploadBatch {
    /// Wrap files in submission order.
    pub fn new(files: Vec<FileDescriptor>) -> Self {
        Self { files }
    }

    /// Derive the job topology from the declared types.
    pub fn topology(&self) -> Topology {
        if self
            .files
            .iter()
            .any(|file| file.declared == DeclaredType::Archive)
        {
            Topology::Archive
        } else {
            Topology::Standalone
        }
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the batch has no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Persisted per-file processing record.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Stored filename.
    pub filename: String,
    /// Client-asserted type.
    pub declared_type: DeclaredType,
    /// Sniffed type label.
    pub detected_type: String,
    /// Size in bytes.
    pub size: usize,
    /// Hex SHA-256 of the content.
    pub sha256: String,
    /// Extracted plain text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    /// Sheets, tables, or key/value pairs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<Value>,
    /// Markdown rendering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    /// Mean OCR confidence when the analyzer supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_confidence: Option<f32>,
    /// Entries extracted from an archive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_entries: Option<usize>,
    /// The three classification opinions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    /// Consensus verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_classification: Option<Verdict>,
    /// Schema-driven field extraction output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_fields: Option<Value>,
    /// Processing failure for this file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileRecord {
    /// Start a record from the descriptor's identity fields.
    pub fn new(file: &FileDescriptor) -> Self {
        Self {
            filename: file.filename.clone(),
            declared_type: file.declared,
            detected_type: file.detected.to_string(),
            size: file.content.len(),
            sha256: hex::encode(Sha256::digest(&file.content)),
            extracted_text: None,
            structured_data: None,
            markdown: None,
            ocr_confidence: None,
            extracted_entries: None,
            classification: None,
            final_classification: None,
            extracted_fields: None,
            error: None,
        }
    }
}

/// Job folder layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Shared folder for an archive batch.
    Archive,
    /// Folder holding one standalone file.
    Single,
}

/// Contents of a job folder's `meta.json`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMetadata {
    /// Job folder identifier.
    pub job_id: String,
    /// Folder layout.
    #[serde(rename = "type")]
    pub kind: JobKind,
    /// RFC 3339 UTC upload time.
    pub upload_time: String,
    /// Number of files recorded.
    pub file_count: usize,
    /// Folder path.
    pub path: String,
    /// Per-file records in submission order.
    pub files: Vec<FileRecord>,
}

/// Result of one orchestration pass.
#[derive(Clone, Debug, Default)]
pub struct UploadOutcome {
    /// Human-readable summary returned to the client.
    pub summary: String,
    /// Job folders created during the pass.
    pub job_folders: Vec<PathBuf>,
}

/// Failures that escape per-file isolation.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A job folder could not be created.
    #[error("failed to create job folder {}: {source}", path.display())]
    Storage {
        /// Folder that could not be created.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// `meta.json` could not be written.
    #[error("failed to write metadata {}: {source}", path.display())]
    Metadata {
        /// Metadata file path.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// Metadata could not be serialised.
    #[error("failed to serialize metadata: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Transport-encoded content could not be decoded.
    #[error("invalid content for {filename}: {source}")]
    InvalidContent {
        /// Client-supplied filename.
        filename: String,
        /// Decoder failure.
        source: base64::DecodeError,
    },
}
