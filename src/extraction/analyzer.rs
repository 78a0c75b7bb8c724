use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::ExtractionError;

/// Result of analysing a non-spreadsheet document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentAnalysis {
    /// Recognised text, one line per detected text line.
    pub text: String,
    /// Mean OCR confidence in percent, when the analyzer reports one.
    pub confidence: Option<f32>,
    /// Detected tables as rows of cells.
    pub tables: Vec<Vec<Vec<String>>>,
    /// Detected form key/value pairs.
    pub key_values: BTreeMap<String, String>,
}

/// Interface implemented by OCR/document analysis services.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    /// Analyse one document's raw bytes.
    async fn analyze(
        &self,
        filename: &str,
        content: &[u8],
    ) -> Result<DocumentAnalysis, ExtractionError>;
}

/// Build the analyzer for an optional service URL.
pub fn build_document_analyzer(base_url: Option<&str>) -> Arc<dyn DocumentAnalyzer> {
    match base_url {
        Some(url) => Arc::new(HttpDocumentAnalyzer::new(url.to_string())),
        None => Arc::new(UnavailableAnalyzer),
    }
}

/// Placeholder used when no analysis service is configured.
pub struct UnavailableAnalyzer;

#[async_trait]
impl DocumentAnalyzer for UnavailableAnalyzer {
    async fn analyze(
        &self,
        _filename: &str,
        _content: &[u8],
    ) -> Result<DocumentAnalysis, ExtractionError> {
        Err(ExtractionError::ServiceUnavailable(
            "no OCR service configured".into(),
        ))
    }
}

/// HTTP client for `POST {base}/analyze`.
pub struct HttpDocumentAnalyzer {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResponse {
    #[serde(default)]
    blocks: Vec<Block>,
    #[serde(default)]
    tables: Vec<Vec<Vec<String>>>,
    #[serde(default)]
    key_values: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Block {
    block_type: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    confidence: f32,
}

impl HttpDocumentAnalyzer {
    /// Create a client targeting `base_url`.
    pub fn new(base_url: String) -> Self {
        let http = Client::builder()
            .user_agent("intakemcp/ocr")
            .build()
            .unwrap_or_else(|error| {
                tracing::warn!(%error, "Falling back to default reqwest client");
                Client::new()
            });
        Self { http, base_url }
    }

    fn endpoint(&self) -> String {
        format!("{}/analyze", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl DocumentAnalyzer for HttpDocumentAnalyzer {
    async fn analyze(
        &self,
        filename: &str,
        content: &[u8],
    ) -> Result<DocumentAnalysis, ExtractionError> {
        let payload = json!({
            "filename": filename,
            "content": STANDARD.encode(content),
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                ExtractionError::ServiceUnavailable(format!(
                    "failed to reach OCR service at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Failed(format!(
                "OCR service returned {status}: {body}"
            )));
        }

        let body: AnalyzeResponse = response.json().await.map_err(|error| {
            ExtractionError::Failed(format!("failed to decode OCR response: {error}"))
        })?;

        Ok(body.into_analysis())
    }
}

impl AnalyzeResponse {
    fn into_analysis(self) -> DocumentAnalysis {
        let lines: Vec<&Block> = self
            .blocks
            .iter()
            .filter(|block| block.block_type == "LINE")
            .collect();

        let text = lines.iter().fold(String::new(), |mut text, block| {
            text.push_str(&block.text);
            text.push('\n');
            text
        });

        let confidence = if lines.is_empty() {
            0.0
        } else {
            lines.iter().map(|block| block.confidence).sum::<f32>() / lines.len() as f32
        };

        DocumentAnalysis {
            text,
            confidence: Some(confidence),
            tables: self.tables,
            key_values: self.key_values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn joins_line_blocks_and_averages_confidence() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/analyze")
                    .body_contains("\"filename\":\"scan.pdf\"")
                    .body_contains(&STANDARD.encode(b"%PDF-1.7"));
                then.status(200).json_body(json!({
                    "blocks": [
                        { "blockType": "PAGE", "text": "", "confidence": 10.0 },
                        { "blockType": "LINE", "text": "Invoice 42", "confidence": 90.0 },
                        { "blockType": "WORD", "text": "Invoice", "confidence": 20.0 },
                        { "blockType": "LINE", "text": "Total 10", "confidence": 80.0 }
                    ],
                    "tables": [[["a", "b"], ["1", "2"]]],
                    "keyValues": { "Invoice": "42" }
                }));
            })
            .await;

        let analysis = HttpDocumentAnalyzer::new(server.base_url())
            .analyze("scan.pdf", b"%PDF-1.7")
            .await
            .expect("analysis");

        mock.assert();
        assert_eq!(analysis.text, "Invoice 42\nTotal 10\n");
        assert_eq!(analysis.confidence, Some(85.0));
        assert_eq!(analysis.tables[0][1], vec!["1", "2"]);
        assert_eq!(analysis.key_values.get("Invoice").map(String::as_str), Some("42"));
    }

    #[tokio::test]
    async fn no_lines_means_zero_confidence() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/analyze");
                then.status(200).json_body(json!({ "blocks": [] }));
            })
            .await;

        let analysis = HttpDocumentAnalyzer::new(server.base_url())
            .analyze("blank.png", b"")
            .await
            .expect("analysis");
        assert_eq!(analysis.text, "");
        assert_eq!(analysis.confidence, Some(0.0));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/analyze");
                then.status(422).body("unsupported document");
            })
            .await;

        let error = HttpDocumentAnalyzer::new(server.base_url())
            .analyze("x.bin", b"x")
            .await
            .expect_err("error");
        assert!(error.to_string().contains("unsupported document"));
    }

    #[tokio::test]
    async fn unavailable_analyzer_fails_fast() {
        let error = UnavailableAnalyzer
            .analyze("x.pdf", b"x")
            .await
            .expect_err("error");
        assert!(matches!(error, ExtractionError::ServiceUnavailable(_)));
    }
}
