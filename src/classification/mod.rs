//! Document classification by three independent methods reconciled through consensus voting.
//!
//! - `pattern`: deterministic `Purpose: <TYPE>` extraction from the text.
//! - `entity`: heuristic over entities returned by the entity detection service.
//! - `llm`: direct classification by the language model.
//!
//! [`consensus`] folds the three opinions into one [`Verdict`].

mod classifier;
mod consensus;
pub mod entity;
mod pattern;

pub use classifier::{Classification, DocumentClassifier};
pub use consensus::consensus;
pub use entity::{DetectedEntity, EntityDetector, EntityError};
pub use pattern::pattern_opinion;

use serde::Serialize;

pub use crate::schema_registry::UNKNOWN_TYPE;

/// One classification method's view of a document.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Opinion {
    /// The method produced a label.
    Vote {
        /// Document type label.
        #[serde(rename = "type")]
        label: String,
        /// Confidence in `[0, 1]`.
        confidence: f64,
    },
    /// The method's collaborator failed; counts as `UNKNOWN` with zero confidence.
    Failed {
        /// Failure description.
        error: String,
    },
}

impl Opinion {
    /// Build a vote.
    pub fn vote(label: impl Into<String>, confidence: f64) -> Self {
        Self::Vote {
            label: label.into(),
            confidence,
        }
    }

    /// Build an error marker.
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    /// Label used for voting; failures read as `UNKNOWN`.
    pub fn label(&self) -> &str {
        match self {
            Self::Vote { label, .. } => label,
            Self::Failed { .. } => UNKNOWN_TYPE,
        }
    }

    /// Confidence used for voting; failures read as `0.0`.
    pub fn confidence(&self) -> f64 {
        match self {
            Self::Vote { confidence, .. } => *confidence,
            Self::Failed { .. } => 0.0,
        }
    }
}

/// Method that decided a verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecidedBy {
    /// At least two methods agreed.
    Consensus,
    /// The pattern method alone, by confidence.
    Pattern,
    /// The entity heuristic alone, by confidence.
    Entity,
    /// The language model alone, by confidence.
    Llm,
}

/// Final classification decision for a document.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Verdict {
    /// Decided document type label.
    #[serde(rename = "type")]
    pub label: String,
    /// Confidence attached to the decision.
    pub confidence: f64,
    /// How the decision was reached.
    pub method: DecidedBy,
}
