// Resume/job matching.
// Implements: prompt construction, the single LLM call, and tolerant reply decoding.
// All LLM calls go through llm_client; nothing here builds HTTP requests.

pub mod decode;
pub mod evaluator;
pub mod handlers;
pub mod models;
pub mod prompts;
