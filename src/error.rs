//! Error types for the edgequake-docsketch library.
//!
//! The two pipelines fail independently, so each gets its own error type:
//!
//! * [`ErdError`] — **Fatal** for the ER diagram pipeline: the upload could
//!   not be parsed or validated, a manual entry broke a limit, or Graphviz
//!   could not render the graph.
//!
//! * [`SummaryError`] — **Fatal** for the summarizer: bad input file,
//!   unsupported extension, PDF problems, provider not configured, every
//!   candidate failed, or the export could not be written.
//!
//! * [`CandidateError`] — **Non-fatal**: a single beam candidate failed but
//!   others may still succeed. Stored inside
//!   [`crate::output::CandidateResult`] so callers can see what went wrong
//!   without losing the whole summary to one flaky request.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the ER diagram pipeline.
#[derive(Debug, Error)]
pub enum ErdError {
    // ── Upload errors ─────────────────────────────────────────────────────
    /// The upload is not a valid literal record.
    #[error("Error processing the file at line {line}, column {column}: {message}. Ensure it's a valid dictionary format.")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// Top-level value is not a mapping with both required keys.
    #[error("Invalid file format: ensure the file has 'entities' and 'relationships' as top-level keys.")]
    MissingTopLevelKeys,

    /// `entities` is not a mapping or `relationships` is not a sequence.
    #[error("Invalid file format: 'entities' should be a dictionary, and 'relationships' should be a list.")]
    InvalidTopLevelShape,

    /// An entity entry has the wrong shape.
    #[error("Invalid entity '{name}': {reason}")]
    InvalidEntity { name: String, reason: String },

    /// A relationship entry has the wrong shape (0-indexed position).
    #[error("Invalid relationship #{index}: {reason}")]
    InvalidRelationship { index: usize, reason: String },

    /// A relationship names an entity that is not defined.
    #[error("Relationship '{relationship}' references undefined entity '{entity}'")]
    UnknownEntity {
        relationship: String,
        entity: String,
    },

    /// The cardinality tag is not one of the recognised spellings.
    #[error("Unknown relationship type '{0}'\nExpected one of: One-to-One, One-to-Many, Many-to-Many.")]
    UnknownCardinality(String),

    // ── Manual entry errors ───────────────────────────────────────────────
    /// Manual entries exceeded a per-invocation cap.
    #[error("Too many {what}: at most {max} allowed")]
    LimitExceeded { what: &'static str, max: usize },

    /// The upload file could not be read.
    #[error("Failed to read '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Rendering errors ──────────────────────────────────────────────────
    /// Requested output format is not known.
    #[error("Unsupported diagram format '{0}'\nSupported: png, pdf, svg, jpeg, dot.")]
    UnsupportedFormat(String),

    /// The Graphviz program could not be spawned.
    #[error("Graphviz renderer '{program}' is not available: {detail}\nInstall Graphviz or pass --dot-binary <PATH>.")]
    RendererUnavailable { program: String, detail: String },

    /// Graphviz ran but did not produce output.
    #[error("Graphviz failed to render {format}: {detail}")]
    RenderFailed { format: String, detail: String },

    /// Graphviz did not finish within the configured timeout.
    #[error("Graphviz timed out after {secs}s rendering {format}")]
    RenderTimeout { format: String, secs: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write a diagram file.
    #[error("Failed to write diagram file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// All fatal errors returned by the summarizer pipeline.
///
/// Candidate-level failures use [`CandidateError`] and are stored in
/// [`crate::output::CandidateResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum SummaryError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// Only PDF and JSON documents are accepted.
    #[error("Unsupported file type '{extension}'\nSupported inputs: .pdf, .json (or pass text directly with --text).")]
    UnsupportedFileType { extension: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file has a `.pdf` extension but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection matched no page of the document.
    #[error("Page selection matches no page (document has {total} pages)")]
    PageOutOfRange { total: usize },

    /// The JSON document could not be parsed.
    #[error("Invalid JSON in '{path}': {detail}")]
    InvalidJson { path: PathBuf, detail: String },

    /// Nothing left to summarise after extraction and cleanup.
    #[error("No text to summarise in '{source_name}'")]
    EmptyText { source_name: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// Every candidate failed after all retries; there is no summary.
    #[error("All {total} summary candidates failed after {retries} retries each.\nFirst error: {first_error}")]
    AllCandidatesFailed {
        total: usize,
        retries: u32,
        first_error: String,
    },

    /// No candidate reached `min_length`, even after follow-up requests.
    #[error("Best summary has {tokens} tokens, below the minimum of {min} after {attempts} follow-up request(s).\nLower --min-length or summarize a longer document.")]
    SummaryTooShort {
        tokens: usize,
        min: usize,
        attempts: u32,
    },

    // ── Export errors ─────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// pdfium could not assemble the summary PDF.
    #[error("Failed to build summary PDF: {0}")]
    PdfExportFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single beam candidate.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum CandidateError {
    /// The model call failed after retries.
    #[error("Candidate {index}: LLM call failed after {retries} retries: {detail}")]
    LlmFailed {
        index: usize,
        retries: u32,
        detail: String,
    },

    /// The model call did not return in time.
    #[error("Candidate {index}: LLM call timed out after {secs}s")]
    Timeout { index: usize, secs: u64 },

    /// The model answered with nothing usable.
    #[error("Candidate {index}: empty completion")]
    Empty { index: usize },
}
