//! Document summarization.
//!
//! ## Data Flow
//!
//! ```text
//! path / URL ──▶ input ──▶ extract ──┐
//!                                    ├─▶ clean ──▶ tokens ──▶ generate ──▶ export
//! --text / stdin ────────────────────┘         (truncate)   (N beams)
//! ```

pub mod clean;
pub mod export;
pub mod extract;
pub mod generate;
pub mod input;
pub mod provider;
pub mod tokens;

use crate::config::SummaryConfig;
use crate::error::SummaryError;
use crate::output::{SourceInfo, SummaryOutput, SummaryStats};
use std::path::Path;
use std::time::Instant;
use tracing::info;

pub use export::{write_summary, ExportFormat};
pub use generate::{Completion, GenerationRequest, LlmBackend, SummaryBackend};
pub use input::SourceKind;

/// Name recorded for inline text input.
pub const INLINE_SOURCE: &str = "<text>";

/// Resolve and extract a file or URL, returning cleaned text.
///
/// Does not require an LLM provider.
pub async fn extract_text(
    input_str: impl AsRef<str>,
    config: &SummaryConfig,
) -> Result<(String, SourceInfo), SummaryError> {
    let input_str = input_str.as_ref();
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let extracted = extract::extract(
        &resolved,
        &config.pages,
        config.password.as_deref(),
        config.json_mode,
    )
    .await?;

    let text = clean::clean_extracted(&extracted.text);
    if text.is_empty() {
        return Err(SummaryError::EmptyText {
            source_name: input_str.to_string(),
        });
    }
    let source = SourceInfo {
        name: input_str.to_string(),
        kind: resolved.kind(),
        page_count: extracted.page_count,
        pages_used: extracted.pages_used,
    };
    Ok((text, source))
}

/// Summarize a PDF or JSON file, or a URL pointing to one.
pub async fn summarize_file(
    input_str: impl AsRef<str>,
    config: &SummaryConfig,
) -> Result<SummaryOutput, SummaryError> {
    let start = Instant::now();
    info!("Starting summary: {}", input_str.as_ref());
    let (text, source) = extract_text(input_str, config).await?;
    let extract_ms = start.elapsed().as_millis() as u64;
    summarize_cleaned(text, source, config, start, extract_ms).await
}

/// Summarize text given directly.
pub async fn summarize_text(
    text: impl AsRef<str>,
    config: &SummaryConfig,
) -> Result<SummaryOutput, SummaryError> {
    let start = Instant::now();
    let text = clean::clean_extracted(text.as_ref());
    if text.is_empty() {
        return Err(SummaryError::EmptyText {
            source_name: INLINE_SOURCE.to_string(),
        });
    }
    let source = SourceInfo {
        name: INLINE_SOURCE.to_string(),
        kind: SourceKind::Text,
        page_count: None,
        pages_used: Vec::new(),
    };
    summarize_cleaned(text, source, config, start, 0).await
}

async fn summarize_cleaned(
    text: String,
    source: SourceInfo,
    config: &SummaryConfig,
    start: Instant,
    extract_duration_ms: u64,
) -> Result<SummaryOutput, SummaryError> {
    let params = &config.params;
    let input_tokens = tokens::count_tokens(&text);
    let (kept, truncated) = tokens::truncate_tokens(&text, params.max_input_tokens);
    let input_tokens_used = tokens::count_tokens(kept);
    if truncated {
        info!(
            "Input truncated from {} to {} tokens",
            input_tokens, input_tokens_used
        );
    }
    if let Some(ref cb) = config.progress_callback {
        cb.on_extract_complete(text.chars().count(), input_tokens, truncated);
    }

    let backend = provider::resolve_backend(config)?;

    let llm_start = Instant::now();
    let generation = generate::generate(backend, kept, config).await?;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    let winner = generation.winner().ok_or_else(|| {
        SummaryError::Internal(format!("chosen candidate {} missing", generation.chosen))
    })?;
    let summary = winner.text.clone();
    let summary_tokens = winner.tokens;

    let completed = generation.candidates.iter().filter(|c| c.is_ok()).count();
    let stats = SummaryStats {
        input_tokens,
        input_tokens_used,
        truncated,
        summary_tokens,
        chosen_candidate: generation.chosen,
        candidates_requested: params.num_beams,
        candidates_completed: completed,
        candidates_failed: generation.candidates.len() - completed,
        candidates_cancelled: generation.cancelled,
        follow_up_requests: generation.follow_ups,
        total_prompt_tokens: generation.candidates.iter().map(|c| c.prompt_tokens as u64).sum(),
        total_completion_tokens: generation
            .candidates
            .iter()
            .map(|c| c.completion_tokens as u64)
            .sum(),
        extract_duration_ms,
        llm_duration_ms,
        total_duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Summary complete: {} tokens from candidate {} ({} completed, {} failed, {} cancelled), {}ms",
        summary_tokens,
        generation.chosen,
        stats.candidates_completed,
        stats.candidates_failed,
        stats.candidates_cancelled,
        stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_summary_complete(generation.chosen, summary_tokens);
    }

    Ok(SummaryOutput {
        summary,
        source,
        candidates: generation.candidates,
        stats,
    })
}

/// Summarize a file and write the summary to `output_path`.
///
/// The format follows the output extension (`.txt`, `.md`, `.pdf`). The
/// extension is checked before any model call.
pub async fn summarize_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &SummaryConfig,
) -> Result<SummaryOutput, SummaryError> {
    ExportFormat::from_path(output_path.as_ref())?;
    let output = summarize_file(input_str, config).await?;
    let label = export::source_label(&output.source.name, output.source.kind);
    write_summary(output_path, &output.summary, label.as_deref()).await?;
    Ok(output)
}

/// Synchronous wrapper around [`summarize_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn summarize_sync(
    input_str: impl AsRef<str>,
    config: &SummaryConfig,
) -> Result<SummaryOutput, SummaryError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SummaryError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(summarize_file(input_str, config))
}
