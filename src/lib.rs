//! # edgequake-docsketch
//!
//! Two document tools sharing one crate:
//!
//! * **ER diagrams**: turn a literal record of entities and relationships
//!   (plus entries added by hand) into a Graphviz diagram.
//! * **Summaries**: extract text from a PDF, JSON document or raw text and
//!   produce a length-bounded abstractive summary with an LLM.
//!
//! ## ER Pipeline
//!
//! ```text
//! upload ─▶ literal ─▶ validate ─┐
//!                                ├─▶ collect ─▶ graph ─▶ dot ─▶ export (dot -T…)
//! manual entries ────────────────┘
//! ```
//!
//! ```rust
//! use edgequake_docsketch::erd::{self, validate::parse_upload};
//! use edgequake_docsketch::DiagramConfig;
//!
//! let model = parse_upload(r#"{"entities": {"User": ["id", "name"]}, "relationships": []}"#).unwrap();
//! let diagram = erd::generate_diagram(&model, &DiagramConfig::default());
//! assert_eq!(diagram.entity_nodes, 1);
//! assert_eq!(diagram.relationship_nodes, 0);
//! ```
//!
//! ## Summary Pipeline
//!
//! ```text
//! PDF / JSON / text
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Extract   pdfium text layer (spawn_blocking) or pretty-printed JSON
//!  ├─ 3. Clean     line endings, hyphenation, invisible characters
//!  ├─ 4. Truncate  max_input_tokens word tokens
//!  ├─ 5. Generate  num_beams concurrent candidates
//!  ├─ 6. Select    length-penalised score, early stopping
//!  └─ 7. Export    .txt / .md / .pdf
//! ```
//!
//! ```rust,no_run
//! use edgequake_docsketch::{summarize_file, SummaryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = SummaryConfig::builder().max_length(80).min_length(30).build()?;
//!     let output = summarize_file("report.pdf", &config).await?;
//!     println!("{}", output.summary);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `erd` and `summarize` binaries (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod erd;
pub mod error;
mod fs;
pub mod output;
pub mod pdf;
pub mod progress;
pub mod prompts;
pub mod summarize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    AttributeStyle, DiagramConfig, DiagramConfigBuilder, JsonTextMode, PageSelection, RankDir,
    ReferencePolicy, SummaryConfig, SummaryConfigBuilder, SummaryParams,
};
pub use erd::{export_diagram, generate_diagram, render_diagram, ImageFormat, InputCollector};
pub use error::{CandidateError, ErdError, SummaryError};
pub use output::{CandidateResult, DiagramOutput, SourceInfo, SummaryOutput, SummaryStats};
pub use progress::{NoopProgressCallback, ProgressCallback, SummaryProgressCallback};
pub use summarize::{
    extract_text, summarize_file, summarize_sync, summarize_text, summarize_to_file,
    SummaryBackend,
};
