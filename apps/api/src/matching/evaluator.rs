//! Match Evaluator — prompt → one completion call → tolerant decode.
//!
//! Upstream failures are returned to the caller untouched; decode problems are
//! absorbed into sentinel results by `decode_match_response`.

use std::sync::Arc;

use tracing::{debug, info};

use crate::llm_client::{CompletionBackend, LlmError};
use crate::matching::decode::decode_match_response;
use crate::matching::models::MatchResult;
use crate::matching::prompts::build_match_prompt;

/// Stateless apart from its backend handle; safe to share across requests.
#[derive(Clone)]
pub struct MatchEvaluator {
    backend: Arc<dyn CompletionBackend>,
}

impl MatchEvaluator {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Evaluates a resume against a job description. Empty inputs are not
    /// rejected here.
    pub async fn evaluate(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<MatchResult, LlmError> {
        let prompt = build_match_prompt(resume_text, job_description);
        debug!("Match prompt built ({} chars)", prompt.len());

        let reply = self.backend.complete(&prompt).await?;
        debug!("Model reply received ({} chars)", reply.len());

        let result = decode_match_response(&reply);
        info!(
            match_score = result.match_score,
            missing_keywords = result.missing_keywords.len(),
            "Match evaluation complete"
        );
        Ok(result)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::CannedBackend;
    use super::*;

    #[tokio::test]
    async fn test_evaluate_decodes_model_reply() {
        let backend = Arc::new(CannedBackend::replying(
            "```json\n{\"matchScore\": 78, \"missingKeywords\": [\"GraphQL\"], \"explanation\": \"Close fit\"}\n```",
        ));
        let evaluator = MatchEvaluator::new(backend.clone());

        let result = evaluator
            .evaluate("Rust developer, REST APIs", "Rust + GraphQL engineer")
            .await
            .unwrap();

        assert_eq!(result.match_score, 78);
        assert_eq!(result.missing_keywords, vec!["GraphQL"]);
        assert_eq!(result.explanation, "Close fit");
    }

    #[tokio::test]
    async fn test_evaluate_sends_exactly_one_prompt_with_both_inputs() {
        let backend = Arc::new(CannedBackend::replying("{}"));
        let evaluator = MatchEvaluator::new(backend.clone());

        evaluator
            .evaluate("RESUME-BODY", "JOB-BODY")
            .await
            .unwrap();

        let prompts = backend.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("RESUME-BODY"));
        assert!(prompts[0].contains("JOB-BODY"));
    }

    #[tokio::test]
    async fn test_evaluate_accepts_empty_inputs() {
        let backend = Arc::new(CannedBackend::replying("no json here"));
        let evaluator = MatchEvaluator::new(backend.clone());

        let result = evaluator.evaluate("", "").await.unwrap();
        assert_eq!(result, MatchResult::no_json_found());
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_evaluate_propagates_upstream_error() {
        let backend = Arc::new(CannedBackend::failing(503, "overloaded"));
        let evaluator = MatchEvaluator::new(backend.clone());

        let err = evaluator.evaluate("resume", "job").await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 503, .. }));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_default_completion_decodes_to_defaults() {
        // The client substitutes "{}" when the provider omits content.
        let backend = Arc::new(CannedBackend::replying("{}"));
        let evaluator = MatchEvaluator::new(backend);

        let result = evaluator.evaluate("r", "j").await.unwrap();
        assert_eq!(result, MatchResult::default());
    }
}
