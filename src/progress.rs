//! Progress-callback trait for summarization events.
//!
//! Inject an [`Arc<dyn SummaryProgressCallback>`] via
//! [`crate::config::SummaryConfigBuilder::progress_callback`] to receive
//! events as text is extracted and candidate summaries come back.
//!
//! # Example
//!
//! ```rust
//! use edgequake_docsketch::{SummaryProgressCallback, SummaryConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     finished: AtomicUsize,
//! }
//!
//! impl SummaryProgressCallback for CountingCallback {
//!     fn on_candidate_complete(&self, index: usize, total: usize, tokens: usize) {
//!         self.finished.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("candidate {}/{}: {} tokens", index + 1, total, tokens);
//!     }
//! }
//!
//! let config = SummaryConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { finished: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the summarizer as a run advances.
///
/// Candidates are requested concurrently, so the candidate hooks may be
/// called from different tasks at once. All methods default to no-ops.
pub trait SummaryProgressCallback: Send + Sync {
    /// Text has been extracted from the source.
    ///
    /// # Arguments
    /// * `chars`     — length of the cleaned text in characters
    /// * `tokens`    — word tokens before truncation
    /// * `truncated` — whether the text exceeded `max_input_tokens`
    fn on_extract_complete(&self, chars: usize, tokens: usize, truncated: bool) {
        let _ = (chars, tokens, truncated);
    }

    /// A candidate request is about to be sent.
    ///
    /// # Arguments
    /// * `index` — 0-indexed candidate number
    /// * `total` — number of candidates requested
    fn on_candidate_start(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// A candidate came back and was measured.
    fn on_candidate_complete(&self, index: usize, total: usize, tokens: usize) {
        let _ = (index, total, tokens);
    }

    /// A candidate failed after all retries.
    fn on_candidate_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// A summary was selected.
    ///
    /// # Arguments
    /// * `chosen` — index of the winning candidate
    /// * `tokens` — length of the final summary
    fn on_summary_complete(&self, chosen: usize, tokens: usize) {
        let _ = (chosen, tokens);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SummaryProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SummaryConfig`].
pub type ProgressCallback = Arc<dyn SummaryProgressCallback>;
