// LLM prompt template for resume/job matching.
// The reply schema here must stay in sync with `MatchResult`.

/// Match prompt template. Replace `{resume_text}` and `{job_description}` before sending.
pub const MATCH_PROMPT_TEMPLATE: &str = r#"You are an AI resume matcher.

Given the resume and job description below, evaluate how well the resume matches the job. Provide:
1. A match score (0-100%)
2. A list of missing or underrepresented keywords/skills as a JSON array
3. A brief explanation

Resume:
{resume_text}

Job Description:
{job_description}

Respond with ONLY JSON like this:
{
"matchScore": number,
"missingKeywords": [string],
"explanation": string
}"#;

/// Fills the template. Both inputs are embedded verbatim.
///
/// The job description is substituted first so that a resume containing the
/// literal `{job_description}` placeholder is not expanded a second time.
pub fn build_match_prompt(resume_text: &str, job_description: &str) -> String {
    let (head, tail) = MATCH_PROMPT_TEMPLATE
        .split_once("{resume_text}")
        .unwrap_or((MATCH_PROMPT_TEMPLATE, ""));
    let tail = tail.replace("{job_description}", job_description);
    format!("{head}{resume_text}{tail}")
}
