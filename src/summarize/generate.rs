//! Candidate generation and length-penalised selection.
//!
//! `num_beams` independent completions are requested concurrently, each at
//! a slightly higher temperature than the last. Every completion is cleaned,
//! clipped to `max_length` and scored; the best score wins. A winner shorter
//! than `min_length` triggers follow-up requests; if none reaches the
//! minimum the run fails with [`SummaryError::SummaryTooShort`].
//!
//! ## Retry Strategy
//!
//! Each candidate retries failed calls with exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`). Per-attempt calls are bounded by
//! `api_timeout_secs`.

use crate::config::{SummaryConfig, SummaryParams};
use crate::error::{CandidateError, SummaryError};
use crate::output::CandidateResult;
use crate::prompts;
use crate::summarize::clean::clean_summary;
use crate::summarize::tokens::{clip_summary, count_tokens};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// One completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_message: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// A raw completion from a backend.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// Anything that can turn a prompt into text.
#[async_trait]
pub trait SummaryBackend: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    async fn complete(&self, request: &GenerationRequest) -> Result<Completion, SummaryError>;
}

/// [`SummaryBackend`] over an `edgequake_llm` provider.
pub struct LlmBackend {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl LlmBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }
}

#[async_trait]
impl SummaryBackend for LlmBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<Completion, SummaryError> {
        let messages = vec![
            ChatMessage::system(request.system_prompt.as_str()),
            ChatMessage::user(request.user_message.as_str()),
        ];
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| SummaryError::LlmApiError {
                message: e.to_string(),
            })?;
        Ok(Completion {
            text: response.content,
            prompt_tokens: response.prompt_tokens as usize,
            completion_tokens: response.completion_tokens as usize,
        })
    }
}

/// Candidates produced by [`generate`] and the winner among them.
#[derive(Debug, Clone)]
pub struct Generation {
    /// Finished candidates sorted by index.
    pub candidates: Vec<CandidateResult>,
    /// `index` of the selected candidate.
    pub chosen: usize,
    /// Candidates dropped by early stopping.
    pub cancelled: usize,
    /// Extra requests made because every candidate was too short.
    pub follow_ups: u32,
}

impl Generation {
    pub fn winner(&self) -> Option<&CandidateResult> {
        self.candidates.iter().find(|c| c.index == self.chosen)
    }
}

/// Length-penalised score of a `tokens`-long summary.
///
/// In range: `(tokens / max_length) ^ length_penalty`, in (0, 1].
/// Too short: `-(min_length - tokens) / max(min_length, 1)`.
pub fn score(tokens: usize, params: &SummaryParams) -> f32 {
    if params.in_range(tokens) {
        let ratio = tokens as f32 / params.max_length.max(1) as f32;
        ratio.powf(params.length_penalty)
    } else if tokens < params.min_length {
        -((params.min_length - tokens) as f32) / params.min_length.max(1) as f32
    } else {
        -((tokens - params.max_length) as f32) / params.max_length.max(1) as f32
    }
}

/// Index of the best-scoring successful candidate; ties go to the lower index.
pub fn select_best(candidates: &[CandidateResult]) -> Option<usize> {
    candidates
        .iter()
        .filter_map(|c| c.score.map(|s| (c.index, s)))
        .fold(None, |best: Option<(usize, f32)>, (index, s)| match best {
            Some((bi, bs)) if bs > s || (bs == s && bi < index) => Some((bi, bs)),
            _ => Some((index, s)),
        })
        .map(|(index, _)| index)
}

/// Generate `num_beams` candidates for `text` and pick one.
///
/// `text` is sent as-is; truncation happens before this call.
pub async fn generate(
    backend: Arc<dyn SummaryBackend>,
    text: &str,
    config: &SummaryConfig,
) -> Result<Generation, SummaryError> {
    let params = &config.params;
    let total = params.num_beams.max(1);
    let system_prompt = prompts::system_prompt(config.system_prompt.as_deref(), params);
    let user_message = prompts::user_message(params, text);

    info!(
        "Generating {} candidate(s) via {} (window {}–{} tokens, early_stopping={})",
        total,
        backend.name(),
        params.min_length,
        params.max_length,
        params.early_stopping
    );

    let mut results = stream::iter((0..total).map(|index| {
        let backend = Arc::clone(&backend);
        let request = GenerationRequest {
            system_prompt: system_prompt.clone(),
            user_message: user_message.clone(),
            temperature: config.candidate_temperature(index),
            max_tokens: config.effective_max_tokens(),
        };
        async move { run_candidate(backend, index, total, request, config).await }
    }))
    .buffer_unordered(config.effective_concurrency());

    let mut candidates = Vec::with_capacity(total);
    while let Some(candidate) = results.next().await {
        let stop = params.early_stopping && candidate.is_ok() && params.in_range(candidate.tokens);
        candidates.push(candidate);
        if stop {
            debug!("Early stop after {} of {} candidates", candidates.len(), total);
            break;
        }
    }
    // Dropping the stream cancels in-flight requests.
    drop(results);

    candidates.sort_by_key(|c| c.index);
    let cancelled = total - candidates.len();

    let mut chosen = match select_best(&candidates) {
        Some(i) => i,
        None => {
            let first_error = candidates
                .iter()
                .find_map(|c| c.error.as_ref())
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(SummaryError::AllCandidatesFailed {
                total: candidates.len(),
                retries: config.max_retries,
                first_error,
            });
        }
    };

    // The winner can only miss the window by being short; clipping caps the
    // top. Ask for a fuller rewrite of it, up to `max_retries` times.
    let mut follow_ups = 0u32;
    loop {
        let Some(best) = candidates.iter().find(|c| c.index == chosen) else {
            break;
        };
        if params.in_range(best.tokens) {
            break;
        }
        if follow_ups >= config.max_retries {
            return Err(SummaryError::SummaryTooShort {
                tokens: best.tokens,
                min: params.min_length,
                attempts: follow_ups,
            });
        }
        follow_ups += 1;
        let index = total + follow_ups as usize - 1;
        info!(
            "Best candidate has {} tokens (< {}); follow-up request {}/{}",
            best.tokens, params.min_length, follow_ups, config.max_retries
        );
        let request = GenerationRequest {
            system_prompt: system_prompt.clone(),
            user_message: prompts::lengthen_message(params, text, &best.text, best.tokens),
            temperature: config.candidate_temperature(0),
            max_tokens: config.effective_max_tokens(),
        };
        let candidate = run_candidate(Arc::clone(&backend), index, index + 1, request, config).await;
        candidates.push(candidate);
        chosen = select_best(&candidates).unwrap_or(chosen);
    }

    Ok(Generation {
        candidates,
        chosen,
        cancelled,
        follow_ups,
    })
}

/// Request, clean, clip and score one candidate. Never fails; errors are
/// recorded in the result.
async fn run_candidate(
    backend: Arc<dyn SummaryBackend>,
    index: usize,
    total: usize,
    request: GenerationRequest,
    config: &SummaryConfig,
) -> CandidateResult {
    let start = Instant::now();
    let params = &config.params;
    if let Some(ref cb) = config.progress_callback {
        cb.on_candidate_start(index, total);
    }

    let per_call = Duration::from_secs(config.api_timeout_secs);
    let mut last_err: Option<CandidateError> = None;
    let mut completion: Option<(Completion, u32)> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_delay_ms(attempt);
            warn!(
                "Candidate {}: retry {}/{} after {}ms",
                index, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(per_call, backend.complete(&request)).await {
            Ok(Ok(c)) => {
                completion = Some((c, attempt));
                break;
            }
            Ok(Err(e)) => {
                warn!("Candidate {}: attempt {} failed: {}", index, attempt + 1, e);
                last_err = Some(CandidateError::LlmFailed {
                    index,
                    retries: attempt,
                    detail: e.to_string(),
                });
            }
            Err(_) => {
                warn!("Candidate {}: attempt {} timed out", index, attempt + 1);
                last_err = Some(CandidateError::Timeout {
                    index,
                    secs: config.api_timeout_secs,
                });
            }
        }
    }

    let mut result = CandidateResult {
        index,
        temperature: request.temperature,
        text: String::new(),
        tokens: 0,
        score: None,
        clipped: false,
        prompt_tokens: 0,
        completion_tokens: 0,
        duration_ms: 0,
        retries: config.max_retries,
        error: None,
    };

    match completion {
        Some((c, attempts)) => {
            result.retries = attempts;
            result.prompt_tokens = c.prompt_tokens;
            result.completion_tokens = c.completion_tokens;
            let cleaned = clean_summary(&c.text);
            if cleaned.is_empty() {
                result.error = Some(CandidateError::Empty { index });
            } else {
                let (text, clipped) = clip_summary(&cleaned, params.max_length, params.min_length);
                result.tokens = count_tokens(&text);
                result.score = Some(score(result.tokens, params));
                result.clipped = clipped;
                result.text = text;
            }
        }
        None => {
            result.error = last_err.or(Some(CandidateError::LlmFailed {
                index,
                retries: config.max_retries,
                detail: "no attempt made".to_string(),
            }));
        }
    }
    result.duration_ms = start.elapsed().as_millis() as u64;

    match &result.error {
        None => {
            debug!(
                "Candidate {}: {} tokens, score {:.3}{}",
                index,
                result.tokens,
                result.score.unwrap_or_default(),
                if result.clipped { " (clipped)" } else { "" }
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_candidate_complete(index, total, result.tokens);
            }
        }
        Some(e) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_candidate_error(index, total, &e.to_string());
            }
        }
    }
    result
}
