//! System prompts for LLM-based summarization.
//!
//! Callers can override the default via [`crate::config::SummaryConfig::system_prompt`];
//! the constants here are used only when no override is provided.

use crate::config::SummaryParams;

/// Default system prompt for abstractive summarization.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a careful summarization engine. You receive a document, possibly truncated, and write an abstractive summary of it.

Follow these rules precisely:

1. CONTENT
   - Cover the main subject, the key findings or claims, and any conclusion
   - Use only information present in the document
   - Do not speculate about content that was cut off

2. FORM
   - Write plain prose in complete sentences
   - No headings, bullet points, tables or Markdown
   - Same language as the document

3. OUTPUT FORMAT
   - Output ONLY the summary text
   - Do NOT add a preamble such as "Here is a summary"
   - Do NOT wrap the answer in quotes or code fences"#;

/// Length instruction appended to the system prompt.
///
/// Word counts are the same unit the output is measured in, so the model
/// aims directly at the acceptance window.
pub fn length_guidance(params: &SummaryParams) -> String {
    let target = target_words(params);
    if params.min_length == 0 {
        format!(
            "\n\n4. LENGTH\n   - At most {} words; aim for about {} words",
            params.max_length, target
        )
    } else {
        format!(
            "\n\n4. LENGTH\n   - Between {} and {} words; aim for about {} words",
            params.min_length, params.max_length, target
        )
    }
}

/// Word count the model is asked to aim for.
///
/// A positive length penalty pushes the target toward `max_length`, zero
/// leaves it at the window midpoint.
pub fn target_words(params: &SummaryParams) -> usize {
    let lo = params.min_length as f32;
    let hi = params.max_length as f32;
    let bias = (params.length_penalty / (1.0 + params.length_penalty)).clamp(0.0, 1.0);
    let mid = (lo + hi) / 2.0;
    let target = mid + (hi - mid) * bias * 0.8;
    (target.round() as usize).clamp(params.min_length, params.max_length)
}

/// Full system prompt: `base` (or the default) plus length guidance.
pub fn system_prompt(base: Option<&str>, params: &SummaryParams) -> String {
    let mut prompt = base.unwrap_or(DEFAULT_SYSTEM_PROMPT).to_string();
    prompt.push_str(&length_guidance(params));
    prompt
}

/// User message: the task prefix followed by the (truncated) document.
pub fn user_message(params: &SummaryParams, text: &str) -> String {
    format!("{}{}", params.task_prefix, text)
}

/// Follow-up user message when every candidate came back too short.
///
/// Repeats the document and shows the best short attempt so the model
/// expands it rather than starting over.
pub fn lengthen_message(params: &SummaryParams, text: &str, previous: &str, previous_tokens: usize) -> String {
    format!(
        "{}\n\nA previous summary had only {} words, below the required minimum of {}:\n\n{}\n\n\
        Rewrite it as a fuller summary of between {} and {} words, adding detail from the document.",
        user_message(params, text),
        previous_tokens,
        params.min_length,
        previous,
        params.min_length,
        params.max_length
    )
}
