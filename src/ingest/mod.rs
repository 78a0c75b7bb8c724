//! Upload orchestration: topology decision, per-file extraction dispatch, classification,
//! field extraction, and job-folder persistence.
//!
//! A batch containing any archive-declared file is stored in one shared job folder and its
//! members are only extracted. Otherwise every file gets its own job folder and runs the full
//! extract, classify, and field-extract pipeline. Per-file failures are folded into that file's
//! record; only storage failures abort a pass.

pub mod detect;
mod orchestrator;
mod storage;
mod types;

pub use detect::ContentKind;
pub use orchestrator::{Collaborators, UploadOrchestrator};
pub use storage::{JobStore, METADATA_FILE};
pub use types::{
    DeclaredType, FileDescriptor, FileRecord, IngestError, JobKind, JobMetadata, Topology,
    UploadBatch, UploadOutcome,
};
