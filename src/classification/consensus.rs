use super::{DecidedBy, Opinion, UNKNOWN_TYPE, Verdict};

/// Reconcile the three classification opinions into one verdict.
///
/// Rules, applied in order:
/// 1. The pattern label matches either other label: pattern label wins with the maximum of all
///    three confidences.
/// 2. Entity and LLM agree on a label other than `UNKNOWN`: that label wins with the mean of
///    their two confidences.
/// 3. Otherwise the most confident single opinion wins; ties prefer pattern, then LLM, then
///    entity.
///
/// A pattern match is binary (confidence 1.0 or 0.0), so rule 1 lets any corroborating method
/// confirm it regardless of the pattern's own confidence.
pub fn consensus(pattern: &Opinion, entity: &Opinion, llm: &Opinion) -> Verdict {
    let (pattern_label, entity_label, llm_label) = (pattern.label(), entity.label(), llm.label());
    let (pattern_conf, entity_conf, llm_conf) =
        (pattern.confidence(), entity.confidence(), llm.confidence());

    if pattern_label == entity_label || pattern_label == llm_label {
        return Verdict {
            label: pattern_label.to_string(),
            confidence: pattern_conf.max(entity_conf).max(llm_conf),
            method: DecidedBy::Consensus,
        };
    }

    if entity_label == llm_label && entity_label != UNKNOWN_TYPE {
        return Verdict {
            label: entity_label.to_string(),
            confidence: (entity_conf + llm_conf) / 2.0,
            method: DecidedBy::Consensus,
        };
    }

    let (label, confidence, method) = if pattern_conf >= entity_conf && pattern_conf >= llm_conf {
        (pattern_label, pattern_conf, DecidedBy::Pattern)
    } else if llm_conf >= entity_conf {
        (llm_label, llm_conf, DecidedBy::Llm)
    } else {
        (entity_label, entity_conf, DecidedBy::Entity)
    };

    Verdict {
        label: label.to_string(),
        confidence,
        method,
    }
}
