//! Service wiring shared by the binary, the protocol layer, and integration tests.

use std::sync::Arc;

use crate::classification::entity::build_entity_detector;
use crate::config::Config;
use crate::extraction::{CalamineReader, build_document_analyzer};
use crate::ingest::{Collaborators, JobStore, UploadOrchestrator};
use crate::jobs::JobManager;
use crate::llm::build_language_model;
use crate::mcp::SessionRegistry;
use crate::metrics::IntakeMetrics;
use crate::schema_registry::SchemaRegistry;

/// Handles to every long-lived service, cheap to clone.
#[derive(Clone)]
pub struct Services {
    /// Upload pipeline.
    pub orchestrator: Arc<UploadOrchestrator>,
    /// Asynchronous job registry and worker pool.
    pub jobs: JobManager,
    /// Custom and built-in extraction schemas.
    pub schemas: Arc<SchemaRegistry>,
    /// Protocol sessions.
    pub sessions: Arc<SessionRegistry>,
    /// Ingestion counters.
    pub metrics: Arc<IntakeMetrics>,
}

impl Services {
    /// Build services with the collaborators named by `config`.
    pub fn from_config(config: &Config) -> Self {
        let collaborators = Collaborators {
            analyzer: build_document_analyzer(config.ocr_service_url.as_deref()),
            spreadsheets: Arc::new(CalamineReader),
            entities: build_entity_detector(config.entity_service_url.as_deref()),
            llm: build_language_model(config),
        };
        Self::with_collaborators(config, collaborators)
    }

    /// Build services around caller-supplied collaborators.
    pub fn with_collaborators(config: &Config, collaborators: Collaborators) -> Self {
        let schemas = Arc::new(SchemaRegistry::new());
        let metrics = Arc::new(IntakeMetrics::new());
        let orchestrator = UploadOrchestrator::new(
            JobStore::new(config.jobs_root.clone()),
            collaborators,
            schemas.clone(),
            metrics.clone(),
        );

        Self {
            orchestrator: Arc::new(orchestrator),
            jobs: JobManager::new(config.job_workers),
            schemas,
            sessions: Arc::new(SessionRegistry::with_ttl_secs(config.session_ttl_secs)),
            metrics,
        }
    }
}
