use std::io;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::types::{IngestError, JobMetadata};

/// Metadata filename written into every job folder.
pub const METADATA_FILE: &str = "meta.json";

/// Date-partitioned job folder storage: `<root>/<yyyy>/<mm>/<dd>/<job-id>/`.
#[derive(Clone, Debug)]
pub struct JobStore {
    root: PathBuf,
}

impl JobStore {
    /// Create a store rooted at `root`. Nothing is created until the first job.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the folder for `job_id` under today's UTC date partition.
    pub async fn create_job_folder(&self, job_id: &str) -> Result<PathBuf, IngestError> {
        let date = OffsetDateTime::now_utc().date();
        let folder = self
            .root
            .join(format!("{:04}", date.year()))
            .join(format!("{:02}", u8::from(date.month())))
            .join(format!("{:02}", date.day()))
            .join(job_id);
        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|source| IngestError::Storage {
                path: folder.clone(),
                source,
            })?;
        Ok(folder)
    }

    /// Write one uploaded file into `folder`, overwriting any previous file of that name.
    pub async fn write_file(
        &self,
        folder: &Path,
        filename: &str,
        content: &[u8],
    ) -> io::Result<PathBuf> {
        let path = folder.join(filename);
        tokio::fs::write(&path, content).await?;
        Ok(path)
    }

    /// Write `meta.json` for a job.
    pub async fn write_metadata(
        &self,
        folder: &Path,
        metadata: &JobMetadata,
    ) -> Result<PathBuf, IngestError> {
        let path = folder.join(METADATA_FILE);
        let body = serde_json::to_vec_pretty(metadata)?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|source| IngestError::Metadata {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

/// Current UTC time as RFC 3339.
pub fn upload_timestamp() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
