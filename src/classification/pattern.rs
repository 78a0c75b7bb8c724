use std::sync::LazyLock;

use regex::Regex;

use super::{Opinion, UNKNOWN_TYPE};

static PURPOSE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Purpose:\s*([A-Z_]+)").expect("valid purpose regex"));

/// Classify by the first `Purpose: <TYPE>` marker in the text.
///
/// A match yields confidence `1.0`; no match yields `UNKNOWN` with `0.0`.
pub fn pattern_opinion(text: &str) -> Opinion {
    match PURPOSE_CODE
        .captures(text)
        .and_then(|captures| captures.get(1))
    {
        Some(code) => Opinion::vote(code.as_str(), 1.0),
        None => Opinion::vote(UNKNOWN_TYPE, 0.0),
    }
}
