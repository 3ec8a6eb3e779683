//! Integration tests for the summarizer.
//!
//! Most tests drive the pipeline with an in-process backend. The `live_*`
//! tests make real LLM calls and are gated behind `E2E_ENABLED`.
//!
//! Run the live tests with:
//!   E2E_ENABLED=1 OPENAI_API_KEY=... cargo test --test summarize live -- --nocapture

use async_trait::async_trait;
use edgequake_docsketch::summarize::{Completion, GenerationRequest, SourceKind};
use edgequake_docsketch::{
    extract_text, summarize_file, summarize_text, summarize_to_file, JsonTextMode, SummaryBackend,
    SummaryConfig, SummaryError, SummaryProgressCallback,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip unless E2E_ENABLED is set and the file at `path` exists.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run live tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// `n` plain word tokens.
fn words(n: usize) -> String {
    (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
}

/// `n` ten-word sentences.
fn sentences(n: usize) -> String {
    (0..n)
        .map(|s| {
            let body: Vec<String> = (0..10).map(|i| format!("s{s}w{i}")).collect();
            format!("{}.", body.join(" "))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns the same reply for every call and records each request.
struct FixedBackend {
    reply: Result<String, String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl FixedBackend {
    fn ok(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.into()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SummaryBackend for FixedBackend {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<Completion, SummaryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        match &self.reply {
            Ok(text) => Ok(Completion {
                text: text.clone(),
                prompt_tokens: 100,
                completion_tokens: 40,
            }),
            Err(e) => Err(SummaryError::LlmApiError { message: e.clone() }),
        }
    }
}

/// Records every progress event as a short line.
#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
}

impl EventLog {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn lines(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl SummaryProgressCallback for EventLog {
    fn on_extract_complete(&self, _chars: usize, tokens: usize, truncated: bool) {
        self.push(format!("extract {tokens} truncated={truncated}"));
    }

    fn on_candidate_start(&self, index: usize, total: usize) {
        self.push(format!("start {index}/{total}"));
    }

    fn on_candidate_complete(&self, index: usize, total: usize, tokens: usize) {
        self.push(format!("done {index}/{total} {tokens}"));
    }

    fn on_candidate_error(&self, index: usize, total: usize, _error: &str) {
        self.push(format!("error {index}/{total}"));
    }

    fn on_summary_complete(&self, chosen: usize, tokens: usize) {
        self.push(format!("summary {chosen} {tokens}"));
    }
}

fn mock_config(backend: Arc<FixedBackend>, beams: usize) -> SummaryConfig {
    SummaryConfig::builder()
        .max_length(50)
        .min_length(30)
        .num_beams(beams)
        .concurrency(1)
        .max_retries(0)
        .backend(backend)
        .build()
        .unwrap()
}

// ── Inline text ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn long_input_is_truncated_and_summary_lands_in_window() {
    let backend = FixedBackend::ok(format!("Here is a summary: {}", sentences(8)));
    let config = mock_config(backend.clone(), 1);

    let output = summarize_text(words(1000), &config).await.unwrap();

    assert_eq!(output.stats.input_tokens, 1000);
    assert_eq!(output.stats.input_tokens_used, 512);
    assert!(output.stats.truncated);
    assert!(
        (30..=50).contains(&output.stats.summary_tokens),
        "summary has {} tokens",
        output.stats.summary_tokens
    );
    assert!(output.summary.starts_with("s0w0"), "preamble kept: {}", output.summary);
    assert!(output.summary.ends_with('.'));
    assert_eq!(output.source.kind, SourceKind::Text);

    let requests = backend.requests.lock().unwrap();
    let sent = &requests[0].user_message;
    assert!(sent.starts_with("summarize: w0 w1"));
    assert!(sent.ends_with("w511"));
    assert!(requests[0].system_prompt.contains("Between 30 and 50 words"));
}

#[tokio::test]
async fn short_input_is_sent_whole() {
    let backend = FixedBackend::ok(sentences(4));
    let config = mock_config(backend.clone(), 1);
    let output = summarize_text(words(100), &config).await.unwrap();
    assert!(!output.stats.truncated);
    assert_eq!(output.stats.input_tokens_used, 100);
}

#[tokio::test]
async fn early_stopping_skips_remaining_beams() {
    let backend = FixedBackend::ok(sentences(4));
    let config = mock_config(backend.clone(), 4);

    let output = summarize_text(words(200), &config).await.unwrap();

    assert_eq!(backend.calls(), 1);
    assert_eq!(output.stats.candidates_requested, 4);
    assert_eq!(output.stats.candidates_completed, 1);
    assert_eq!(output.stats.candidates_cancelled, 3);
    assert_eq!(output.stats.total_prompt_tokens, 100);
}

#[tokio::test]
async fn all_beams_run_without_early_stopping() {
    let backend = FixedBackend::ok(sentences(4));
    let config = SummaryConfig::builder()
        .max_length(50)
        .min_length(30)
        .num_beams(3)
        .early_stopping(false)
        .max_retries(0)
        .backend(backend.clone())
        .build()
        .unwrap();

    let output = summarize_text(words(200), &config).await.unwrap();

    assert_eq!(backend.calls(), 3);
    assert_eq!(output.candidates.len(), 3);
    assert_eq!(output.stats.chosen_candidate, 0);
    let temps: Vec<f32> = output.candidates.iter().map(|c| c.temperature).collect();
    assert!(temps.windows(2).all(|w| w[0] < w[1]), "temperatures {temps:?}");
}

#[tokio::test]
async fn too_short_replies_are_an_error_not_a_summary() {
    let backend = FixedBackend::ok("one two three four five six seven eight nine ten.");
    let config = mock_config(backend.clone(), 4);

    let err = summarize_text(words(1000), &config).await.unwrap_err();

    assert!(
        matches!(err, SummaryError::SummaryTooShort { tokens: 11, min: 30, .. }),
        "got {err:?}"
    );
    assert_eq!(backend.calls(), 4);
}

#[tokio::test]
async fn progress_events_follow_the_run() {
    let backend = FixedBackend::ok(sentences(4));
    let log = Arc::new(EventLog::default());
    let config = SummaryConfig::builder()
        .max_length(50)
        .min_length(30)
        .num_beams(2)
        .concurrency(1)
        .max_retries(0)
        .backend(backend)
        .progress_callback(log.clone())
        .build()
        .unwrap();

    summarize_text(words(600), &config).await.unwrap();

    assert_eq!(
        log.lines(),
        vec![
            "extract 600 truncated=true".to_string(),
            "start 0/2".to_string(),
            "done 0/2 44".to_string(),
            "summary 0 44".to_string(),
        ]
    );
}

#[tokio::test]
async fn progress_reports_failed_candidates() {
    let log = Arc::new(EventLog::default());
    let config = SummaryConfig::builder()
        .num_beams(1)
        .max_retries(0)
        .backend(FixedBackend::failing("HTTP 500"))
        .progress_callback(log.clone())
        .build()
        .unwrap();

    assert!(summarize_text(words(20), &config).await.is_err());
    assert_eq!(log.lines().last().map(String::as_str), Some("error 0/1"));
}

#[tokio::test]
async fn failing_backend_reports_all_candidates_failed() {
    let backend = FixedBackend::failing("HTTP 503");
    let config = mock_config(backend.clone(), 2);

    let err = summarize_text(words(50), &config).await.unwrap_err();

    assert!(matches!(err, SummaryError::AllCandidatesFailed { total: 2, .. }), "got {err:?}");
    assert!(err.to_string().contains("HTTP 503"));
}

#[tokio::test]
async fn blank_input_is_rejected_before_any_call() {
    let backend = FixedBackend::ok("unused");
    let config = mock_config(backend.clone(), 1);
    let err = summarize_text(" \n\t ", &config).await.unwrap_err();
    assert!(matches!(err, SummaryError::EmptyText { .. }));
    assert_eq!(backend.calls(), 0);
}

// ── Files ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn json_file_is_extracted_in_document_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    std::fs::write(&path, r#"{"title": "Quarterly report", "body": ["Revenue grew.", 42]}"#).unwrap();
    let path_str = path.to_string_lossy().to_string();

    let config = SummaryConfig::default();
    let (text, source) = extract_text(&path_str, &config).await.unwrap();
    assert_eq!(source.kind, SourceKind::Json);
    assert!(text.find("title").unwrap() < text.find("body").unwrap());

    let config = SummaryConfig::builder()
        .json_mode(JsonTextMode::StringsOnly)
        .build()
        .unwrap();
    let (text, _) = extract_text(&path_str, &config).await.unwrap();
    assert_eq!(text, "Quarterly report\nRevenue grew.");
}

#[tokio::test]
async fn unsupported_input_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.docx");
    std::fs::write(&path, "x").unwrap();
    let backend = FixedBackend::ok("unused");
    let err = summarize_file(path.to_string_lossy(), &mock_config(backend.clone(), 1))
        .await
        .unwrap_err();
    assert!(matches!(err, SummaryError::UnsupportedFileType { .. }), "got {err:?}");
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn missing_input_file() {
    let backend = FixedBackend::ok("unused");
    let err = summarize_file("/no/such/report.pdf", &mock_config(backend, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, SummaryError::FileNotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn summary_written_as_markdown_and_text() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("paper.json");
    std::fs::write(&input, format!(r#"{{"abstract": "{}"}}"#, words(300))).unwrap();
    let input = input.to_string_lossy().to_string();
    let backend = FixedBackend::ok(sentences(4));
    let config = mock_config(backend, 1);

    let md = dir.path().join("summary.md");
    let output = summarize_to_file(&input, &md, &config).await.unwrap();
    let written = std::fs::read_to_string(&md).unwrap();
    assert!(written.starts_with("# Summary\n\n*Source: "));
    assert!(written.contains("paper.json"));
    assert!(written.ends_with(&format!("{}\n", output.summary)));

    let txt = dir.path().join("summary.txt");
    summarize_to_file(&input, &txt, &config).await.unwrap();
    assert_eq!(
        std::fs::read_to_string(&txt).unwrap(),
        format!("{}\n", output.summary)
    );
}

#[tokio::test]
async fn unsupported_output_extension_fails_before_generation() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.json");
    std::fs::write(&input, r#"{"a": "b"}"#).unwrap();
    let backend = FixedBackend::ok(sentences(4));
    let err = summarize_to_file(
        input.to_string_lossy(),
        dir.path().join("out.docx"),
        &mock_config(backend.clone(), 1),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SummaryError::UnsupportedFileType { .. }));
    assert_eq!(backend.calls(), 0);
}

// ── Live ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn live_summarize_pdf() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));
    let config = SummaryConfig::builder()
        .max_length(80)
        .min_length(20)
        .num_beams(2)
        .build()
        .unwrap();

    let output = summarize_file(pdf.to_string_lossy(), &config).await.unwrap();

    println!("{}", output.summary);
    assert_eq!(output.source.kind, SourceKind::Pdf);
    assert!(output.source.page_count.unwrap_or(0) > 0);
    assert!(output.stats.summary_tokens <= 80);
    assert!(!output.summary.trim().is_empty());
}

#[tokio::test]
async fn live_summary_to_pdf() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("summary.pdf");

    summarize_to_file(pdf.to_string_lossy(), &out, &SummaryConfig::default())
        .await
        .unwrap();

    let bytes = std::fs::read(&out).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}
