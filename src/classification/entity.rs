//! Entity-heuristic classification backed by a remote entity detection service.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use super::{Opinion, UNKNOWN_TYPE};
use crate::llm::truncate_chars;
use crate::schema_registry::KnownDocumentType;

/// Maximum number of characters sent to the entity detection service.
pub const ENTITY_TEXT_LIMIT: usize = 5000;

/// Confidence attached to every heuristic decision.
const ENTITY_CONFIDENCE: f64 = 0.5;

/// Quantity entities required (strictly more than) to call a document a schedule.
const SCHEDULE_QUANTITY_THRESHOLD: usize = 2;

/// Errors raised by entity detection backends.
#[derive(Debug, Error)]
pub enum EntityError {
    /// Service was not configured or could not be reached.
    #[error("Entity service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Service answered with an error or an unreadable payload.
    #[error("Entity detection failed: {0}")]
    DetectionFailed(String),
}

/// Entity reported by the detection service.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DetectedEntity {
    /// Entity category, e.g. `QUANTITY`, `DATE`, `ORGANIZATION`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Matched text.
    #[serde(default)]
    pub text: String,
}

/// Interface implemented by entity detection services.
#[async_trait]
pub trait EntityDetector: Send + Sync {
    /// Detect entities in English text.
    async fn detect_entities(&self, text: &str) -> Result<Vec<DetectedEntity>, EntityError>;
}

/// Build the entity detector for an optional service URL.
pub fn build_entity_detector(base_url: Option<&str>) -> Arc<dyn EntityDetector> {
    match base_url {
        Some(url) => Arc::new(HttpEntityDetector::new(url.to_string())),
        None => Arc::new(UnavailableEntityDetector),
    }
}

/// Run the entity heuristic: more than two quantities reads as a production schedule.
pub async fn entity_opinion(detector: &dyn EntityDetector, text: &str) -> Opinion {
    match detector
        .detect_entities(truncate_chars(text, ENTITY_TEXT_LIMIT))
        .await
    {
        Ok(entities) => {
            let quantities = entities
                .iter()
                .filter(|entity| entity.kind.eq_ignore_ascii_case("QUANTITY"))
                .count();
            let label = if quantities > SCHEDULE_QUANTITY_THRESHOLD {
                KnownDocumentType::ScheduleProduction.as_str()
            } else {
                UNKNOWN_TYPE
            };
            Opinion::vote(label, ENTITY_CONFIDENCE)
        }
        Err(error) => {
            tracing::error!(%error, "Entity classification failed");
            Opinion::failed(error.to_string())
        }
    }
}

/// Placeholder used when no entity service is configured.
pub struct UnavailableEntityDetector;

#[async_trait]
impl EntityDetector for UnavailableEntityDetector {
    async fn detect_entities(&self, _text: &str) -> Result<Vec<DetectedEntity>, EntityError> {
        Err(EntityError::ServiceUnavailable(
            "no entity service configured".into(),
        ))
    }
}

/// HTTP client for `POST {base}/entities`.
pub struct HttpEntityDetector {
    http: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct EntitiesResponse {
    #[serde(default)]
    entities: Vec<DetectedEntity>,
}

impl HttpEntityDetector {
    /// Create a client targeting `base_url`.
    pub fn new(base_url: String) -> Self {
        Self {
            http: Client::builder()
                .user_agent("intakemcp/entities")
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/entities", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl EntityDetector for HttpEntityDetector {
    async fn detect_entities(&self, text: &str) -> Result<Vec<DetectedEntity>, EntityError> {
        let response = self
            .http
            .post(self.endpoint())
            .json(&json!({ "text": text, "languageCode": "en" }))
            .send()
            .await
            .map_err(|error| {
                EntityError::ServiceUnavailable(format!(
                    "failed to reach entity service at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EntityError::DetectionFailed(format!(
                "entity service returned {status}: {body}"
            )));
        }

        let payload: EntitiesResponse = response.json().await.map_err(|error| {
            EntityError::DetectionFailed(format!("failed to decode entity response: {error}"))
        })?;
        Ok(payload.entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    struct FixedEntities(Vec<&'static str>);

    #[async_trait]
    impl EntityDetector for FixedEntities {
        async fn detect_entities(&self, _text: &str) -> Result<Vec<DetectedEntity>, EntityError> {
            Ok(self
                .0
                .iter()
                .map(|kind| DetectedEntity {
                    kind: kind.to_string(),
                    text: String::new(),
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn three_quantities_read_as_schedule() {
        let detector = FixedEntities(vec!["QUANTITY", "QUANTITY", "DATE", "QUANTITY"]);
        let opinion = entity_opinion(&detector, "text").await;
        assert_eq!(opinion, Opinion::vote("SCHEDULE_PRODUCTION", 0.5));
    }

    #[tokio::test]
    async fn two_quantities_read_as_unknown_with_fixed_confidence() {
        let detector = FixedEntities(vec!["QUANTITY", "QUANTITY"]);
        let opinion = entity_opinion(&detector, "text").await;
        assert_eq!(opinion, Opinion::vote(UNKNOWN_TYPE, 0.5));
    }

    #[tokio::test]
    async fn failures_become_error_markers() {
        let opinion = entity_opinion(&UnavailableEntityDetector, "text").await;
        assert!(matches!(opinion, Opinion::Failed { .. }));
        assert_eq!(opinion.label(), UNKNOWN_TYPE);
        assert_eq!(opinion.confidence(), 0.0);
    }

    #[tokio::test]
    async fn http_detector_parses_entities() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/entities")
                    .body_contains("\"languageCode\":\"en\"");
                then.status(200).json_body(json!({
                    "entities": [
                        { "type": "QUANTITY", "text": "12 units" },
                        { "type": "DATE", "text": "2024-01-01" }
                    ]
                }));
            })
            .await;

        let detector = HttpEntityDetector::new(server.base_url());
        let entities = detector
            .detect_entities("12 units on 2024-01-01")
            .await
            .expect("entities");

        mock.assert();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].kind, "QUANTITY");
    }

    #[tokio::test]
    async fn http_detector_maps_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/entities");
                then.status(503).body("overloaded");
            })
            .await;

        let error = HttpEntityDetector::new(server.base_url())
            .detect_entities("text")
            .await
            .expect_err("error");
        assert!(matches!(error, EntityError::DetectionFailed(message) if message.contains("503")));
    }
}
