use std::sync::Arc;

use serde::Serialize;

use super::entity::entity_opinion;
use super::{EntityDetector, Opinion, Verdict, consensus, pattern_opinion};
use crate::llm::{LanguageModel, truncate_chars};
use crate::schema_registry::KnownDocumentType;

/// Maximum number of characters shown to the language model for classification.
const LLM_CLASSIFY_TEXT_LIMIT: usize = 1000;
const LLM_CLASSIFY_MAX_TOKENS: u32 = 50;
const LLM_CONFIDENCE: f64 = 0.95;

/// The three opinions gathered for one document.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Classification {
    /// Pattern extraction opinion.
    pub pattern: Opinion,
    /// Entity heuristic opinion.
    pub entity: Opinion,
    /// Language model opinion.
    pub llm: Opinion,
}

impl Classification {
    /// Fold the opinions into a single verdict.
    pub fn consensus(&self) -> Verdict {
        consensus(&self.pattern, &self.entity, &self.llm)
    }
}

/// Runs all three classification methods over extracted text.
#[derive(Clone)]
pub struct DocumentClassifier {
    entities: Arc<dyn EntityDetector>,
    llm: Arc<dyn LanguageModel>,
}

impl DocumentClassifier {
    /// Create a classifier over the given collaborators.
    pub fn new(entities: Arc<dyn EntityDetector>, llm: Arc<dyn LanguageModel>) -> Self {
        Self { entities, llm }
    }

    /// Gather the pattern, entity, and LLM opinions. Never fails; collaborator errors become
    /// error markers on the affected opinion.
    pub async fn classify(&self, text: &str) -> Classification {
        let pattern = pattern_opinion(text);
        let (entity, llm) = tokio::join!(
            entity_opinion(self.entities.as_ref(), text),
            self.llm_opinion(text)
        );
        tracing::debug!(
            pattern = pattern.label(),
            entity = entity.label(),
            llm = llm.label(),
            "Classification opinions gathered"
        );
        Classification {
            pattern,
            entity,
            llm,
        }
    }

    async fn llm_opinion(&self, text: &str) -> Opinion {
        let prompt = classification_prompt(text);
        match self.llm.complete(&prompt, LLM_CLASSIFY_MAX_TOKENS).await {
            Ok(answer) => Opinion::vote(answer.trim().to_uppercase(), LLM_CONFIDENCE),
            Err(error) => {
                tracing::error!(%error, "LLM classification failed");
                Opinion::failed(error.to_string())
            }
        }
    }
}

fn classification_prompt(text: &str) -> String {
    let choices = KnownDocumentType::ALL
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Classify this document as exactly one of: {choices}\n\n\
         Guidelines:\n\
         - INVOICE_PRODUCTION: Contains invoice number, customer, items, amounts, total\n\
         - PURCHASE_ORDER: Contains PO number, vendor, items to purchase, delivery info\n\
         - SCHEDULE_PRODUCTION: Contains production schedule, quantities, dates, line assignments\n\
         - CUSTOMS_DECLARATION: Contains customs info, origin, destination, declared items\n\n\
         Document text:\n{}\n\nRespond with ONLY the classification type.",
        truncate_chars(text, LLM_CLASSIFY_TEXT_LIMIT)
    )
}
