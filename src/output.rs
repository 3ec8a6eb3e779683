//! Result types returned by the diagram and summary pipelines.

use crate::error::CandidateError;
use crate::summarize::input::SourceKind;
use serde::{Deserialize, Serialize};

/// A generated ER diagram, before any Graphviz rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramOutput {
    /// Graphviz DOT source.
    pub dot: String,
    /// Entity nodes in the graph.
    pub entity_nodes: usize,
    /// Connector (diamond) nodes, one per relationship.
    pub relationship_nodes: usize,
    /// All nodes, including satellite attributes.
    pub total_nodes: usize,
    pub total_edges: usize,
}

/// Where the summarised text came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Path, URL or `"<text>"` for inline input.
    pub name: String,
    pub kind: SourceKind,
    /// PDF page count; None for other kinds.
    pub page_count: Option<usize>,
    /// Pages whose text was used (1-indexed).
    pub pages_used: Vec<usize>,
}

/// One beam candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    /// 0-indexed candidate number.
    pub index: usize,
    pub temperature: f32,
    /// Cleaned and clipped text; empty on failure.
    pub text: String,
    /// Word tokens in `text`.
    pub tokens: usize,
    /// Length-penalised score; None for failed candidates.
    pub score: Option<f32>,
    /// `text` was shortened to `max_length`.
    pub clipped: bool,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub duration_ms: u64,
    /// Retry attempts used.
    pub retries: u32,
    pub error: Option<CandidateError>,
}

impl CandidateResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate numbers for a summary run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Word tokens in the cleaned source text.
    pub input_tokens: usize,
    /// Word tokens actually sent after truncation.
    pub input_tokens_used: usize,
    pub truncated: bool,
    pub summary_tokens: usize,
    /// Index of the winning candidate.
    pub chosen_candidate: usize,
    pub candidates_requested: usize,
    pub candidates_completed: usize,
    pub candidates_failed: usize,
    /// Candidates dropped by early stopping.
    pub candidates_cancelled: usize,
    /// Follow-up requests made because every candidate was too short.
    pub follow_up_requests: u32,
    pub total_prompt_tokens: u64,
    pub total_completion_tokens: u64,
    pub extract_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// The result of [`crate::summarize::summarize_file`] and friends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryOutput {
    pub summary: String,
    pub source: SourceInfo,
    /// Every candidate that finished (successfully or not), in index order.
    pub candidates: Vec<CandidateResult>,
    pub stats: SummaryStats,
}
