//! Response decoding — turns the model's free-form reply into a `MatchResult`.
//!
//! Pure and side-effect free apart from logging, so every branch is testable
//! with canned strings.
//!
//! Candidate location:
//! 1. A fenced ```` ```json ```` block (tag matched case-insensitively). Its
//!    trimmed body is the candidate when non-empty.
//! 2. Otherwise the span from the first `{` to the last `}` inclusive. Stray
//!    braces in surrounding prose widen this span and make it unparseable;
//!    that outcome is accepted and reported as a parse failure.
//!
//! No candidate yields the "no JSON" sentinel; a candidate that is not a JSON
//! object yields the "parse failed" sentinel.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::matching::models::MatchResult;

/// Which strategy located the JSON candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    FencedBlock,
    BraceScan,
}

/// Decodes a raw model reply. Never fails: undecodable replies become
/// sentinel results.
pub fn decode_match_response(raw: &str) -> MatchResult {
    let Some((candidate, source)) = locate_json_candidate(raw) else {
        warn!("No JSON region found in model reply");
        return MatchResult::no_json_found();
    };
    debug!("JSON candidate located via {source:?}");

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(object)) => coerce_match_result(&object),
        Ok(other) => {
            warn!("Model reply JSON is not an object: {}", json_kind(&other));
            MatchResult::parse_failed()
        }
        Err(e) => {
            warn!("Failed to parse JSON candidate from model reply: {e}");
            MatchResult::parse_failed()
        }
    }
}

/// Finds the JSON candidate in a reply, preferring a fenced json block over
/// the brace scan.
pub fn locate_json_candidate(raw: &str) -> Option<(&str, CandidateSource)> {
    if let Some(inner) = fenced_json_block(raw) {
        return Some((inner, CandidateSource::FencedBlock));
    }
    brace_span(raw).map(|span| (span, CandidateSource::BraceScan))
}

fn fenced_json_block(raw: &str) -> Option<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?is)```json\s*(.*?)```").unwrap());

    let inner = re.captures(raw)?.get(1)?.as_str().trim();
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}

/// First `{` through last `}`, inclusive.
fn brace_span(raw: &str) -> Option<&str> {
    let first = raw.find('{')?;
    let last = raw.rfind('}')?;
    if last > first {
        Some(&raw[first..=last])
    } else {
        None
    }
}

/// Maps a parsed object onto the fixed schema, substituting defaults for
/// missing or mistyped fields.
fn coerce_match_result(object: &Map<String, Value>) -> MatchResult {
    let match_score = match object.get("matchScore") {
        Some(value) => coerce_score(value).unwrap_or_else(|| {
            warn!("matchScore has unusable type {}; using 0", json_kind(value));
            0
        }),
        None => {
            warn!("matchScore missing from model reply; using 0");
            0
        }
    };

    let missing_keywords = match object.get("missingKeywords") {
        Some(Value::Array(items)) => {
            let keywords: Vec<String> = items
                .iter()
                .filter_map(|item| item.as_str().map(String::from))
                .collect();
            if keywords.len() != items.len() {
                warn!(
                    "Dropped {} non-string entries from missingKeywords",
                    items.len() - keywords.len()
                );
            }
            keywords
        }
        Some(Value::String(single)) => vec![single.clone()],
        Some(other) => {
            warn!(
                "missingKeywords has unusable type {}; using []",
                json_kind(other)
            );
            vec![]
        }
        None => {
            warn!("missingKeywords missing from model reply; using []");
            vec![]
        }
    };

    let explanation = match object.get("explanation") {
        Some(Value::String(text)) => text.clone(),
        Some(other) => {
            warn!(
                "explanation has unusable type {}; using empty string",
                json_kind(other)
            );
            String::new()
        }
        None => {
            warn!("explanation missing from model reply; using empty string");
            String::new()
        }
    };

    MatchResult {
        match_score,
        missing_keywords,
        explanation,
    }
}

fn coerce_score(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.round() as i64),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(score: i64, keywords: &[&str], explanation: &str) -> MatchResult {
        MatchResult {
            match_score: score,
            missing_keywords: keywords.iter().map(|k| k.to_string()).collect(),
            explanation: explanation.to_string(),
        }
    }

    #[test]
    fn test_fenced_json_block() {
        let raw = "```json { \"matchScore\": 80, \"missingKeywords\": [\"SQL\"], \"explanation\": \"ok\" } ```";
        assert_eq!(decode_match_response(raw), result(80, &["SQL"], "ok"));
    }

    #[test]
    fn test_fenced_block_with_prose_and_newlines() {
        let raw = "Here is my evaluation:\n\n```json\n{\n  \"matchScore\": 64,\n  \"missingKeywords\": [\"Kubernetes\", \"Terraform\"],\n  \"explanation\": \"Solid backend, light on infra.\"\n}\n```\nLet me know if you need more.";
        assert_eq!(
            decode_match_response(raw),
            result(64, &["Kubernetes", "Terraform"], "Solid backend, light on infra.")
        );
    }

    #[test]
    fn test_fence_tag_is_case_insensitive() {
        let raw = "```JSON\n{\"matchScore\": 12, \"missingKeywords\": [], \"explanation\": \"x\"}\n```";
        assert_eq!(
            locate_json_candidate(raw).map(|(_, s)| s),
            Some(CandidateSource::FencedBlock)
        );
        assert_eq!(decode_match_response(raw).match_score, 12);
    }

    #[test]
    fn test_fenced_block_preferred_over_other_braces() {
        let raw = "Template: {\"matchScore\": 1}\n```json\n{\"matchScore\": 90, \"missingKeywords\": [], \"explanation\": \"fenced\"}\n```";
        assert_eq!(decode_match_response(raw), result(90, &[], "fenced"));
    }

    #[test]
    fn test_brace_scan_fallback() {
        let raw = r#"Sure! {"matchScore": 50, "missingKeywords": [], "explanation": "fine"} thanks"#;
        assert_eq!(
            locate_json_candidate(raw).map(|(_, s)| s),
            Some(CandidateSource::BraceScan)
        );
        assert_eq!(decode_match_response(raw), result(50, &[], "fine"));
    }

    #[test]
    fn test_untagged_fence_uses_brace_scan() {
        let raw = "```\n{\"matchScore\": 33, \"missingKeywords\": [\"Go\"], \"explanation\": \"meh\"}\n```";
        assert_eq!(decode_match_response(raw), result(33, &["Go"], "meh"));
    }

    #[test]
    fn test_empty_fenced_block_falls_back_to_brace_scan() {
        let raw = "```json\n```\n{\"matchScore\": 7, \"missingKeywords\": [], \"explanation\": \"late\"}";
        assert_eq!(decode_match_response(raw), result(7, &[], "late"));
    }

    #[test]
    fn test_no_braces_yields_no_json_sentinel() {
        let raw = "I'm sorry, I can't evaluate this resume.";
        assert_eq!(decode_match_response(raw), MatchResult::no_json_found());
    }

    #[test]
    fn test_close_before_open_yields_no_json_sentinel() {
        assert_eq!(decode_match_response("} oops {"), MatchResult::no_json_found());
    }

    #[test]
    fn test_unparseable_interior_yields_parse_failed_sentinel() {
        assert_eq!(
            decode_match_response("{not valid json}"),
            MatchResult::parse_failed()
        );
    }

    #[test]
    fn test_brace_scan_spans_first_open_to_last_close() {
        // Two objects: the scan deliberately takes the whole span, which is not valid JSON.
        let raw = r#"{"matchScore": 10} and also {"matchScore": 20}"#;
        let (candidate, _) = locate_json_candidate(raw).unwrap();
        assert_eq!(candidate, raw);
        assert_eq!(decode_match_response(raw), MatchResult::parse_failed());
    }

    #[test]
    fn test_stray_brace_in_prose_widens_span() {
        let raw = r#"Use {braces} carefully: {"matchScore": 40, "missingKeywords": [], "explanation": "x"}"#;
        let (candidate, _) = locate_json_candidate(raw).unwrap();
        assert!(candidate.starts_with("{braces}"));
        assert_eq!(decode_match_response(raw), MatchResult::parse_failed());
    }

    #[test]
    fn test_non_object_fenced_json_is_parse_failure() {
        let raw = "```json\n[1, 2, 3]\n```";
        assert_eq!(decode_match_response(raw), MatchResult::parse_failed());
    }

    #[test]
    fn test_empty_object_gets_defaults() {
        assert_eq!(decode_match_response("{}"), MatchResult::default());
    }

    #[test]
    fn test_score_coercion() {
        let decode_score = |raw: &str| decode_match_response(raw).match_score;
        assert_eq!(decode_score(r#"{"matchScore": 72.6}"#), 73);
        assert_eq!(decode_score(r#"{"matchScore": "85"}"#), 85);
        assert_eq!(decode_score(r#"{"matchScore": "85%"}"#), 85);
        assert_eq!(decode_score(r#"{"matchScore": "high"}"#), 0);
        assert_eq!(decode_score(r#"{"matchScore": null}"#), 0);
    }

    #[test]
    fn test_score_is_not_clamped() {
        assert_eq!(decode_match_response(r#"{"matchScore": 140}"#).match_score, 140);
        assert_eq!(decode_match_response(r#"{"matchScore": -5}"#).match_score, -5);
    }

    #[test]
    fn test_keyword_coercion() {
        let mixed = decode_match_response(r#"{"missingKeywords": ["SQL", 3, null, "Go"]}"#);
        assert_eq!(mixed.missing_keywords, vec!["SQL", "Go"]);

        let single = decode_match_response(r#"{"missingKeywords": "Docker"}"#);
        assert_eq!(single.missing_keywords, vec!["Docker"]);

        let wrong = decode_match_response(r#"{"missingKeywords": {"a": 1}}"#);
        assert!(wrong.missing_keywords.is_empty());
    }

    #[test]
    fn test_non_string_explanation_becomes_empty() {
        let decoded = decode_match_response(r#"{"matchScore": 5, "explanation": ["a"]}"#);
        assert_eq!(decoded.explanation, "");
    }

    #[test]
    fn test_extra_keys_are_ignored() {
        let raw = r#"{"matchScore": 61, "missingKeywords": [], "explanation": "e", "confidence": "high"}"#;
        assert_eq!(decode_match_response(raw), result(61, &[], "e"));
    }

    #[test]
    fn test_decode_is_idempotent() {
        let raw = "noise ```json {\"matchScore\": 55, \"missingKeywords\": [\"AWS\"], \"explanation\": \"same\"} ``` noise";
        assert_eq!(decode_match_response(raw), decode_match_response(raw));
    }
}
