use serde::Serialize;

pub const NO_JSON_FOUND: &str = "No JSON found in AI response.";
pub const PARSE_FAILED: &str = "Failed to parse AI response.";

/// The match report returned to callers. Field names are part of the public
/// JSON contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// Intended range 0–100; passed through unclamped.
    pub match_score: i64,
    pub missing_keywords: Vec<String>,
    pub explanation: String,
}

impl MatchResult {
    /// Score 0, no keywords, and a fixed explanation. Used when the model's
    /// reply cannot be decoded.
    pub fn sentinel(explanation: &str) -> Self {
        Self {
            match_score: 0,
            missing_keywords: vec![],
            explanation: explanation.to_string(),
        }
    }

    pub fn no_json_found() -> Self {
        Self::sentinel(NO_JSON_FOUND)
    }

    pub fn parse_failed() -> Self {
        Self::sentinel(PARSE_FAILED)
    }
}
