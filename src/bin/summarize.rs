//! CLI binary for document summarization.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `SummaryConfig` and prints or writes the summary.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_docsketch::summarize::clean::clean_extracted;
use edgequake_docsketch::summarize::export::ExportFormat;
use edgequake_docsketch::summarize::tokens::truncate_tokens;
use edgequake_docsketch::{
    extract_text, summarize_file, summarize_text, summarize_to_file, JsonTextMode, PageSelection,
    ProgressCallback, SummaryConfig, SummaryOutput, SummaryProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Spinner ──────────────────────────────────────────────────────────────────

/// "Summarizing…" spinner with one log line per candidate.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Summarizing…");
        bar.set_message("extracting text");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl SummaryProgressCallback for CliProgressCallback {
    fn on_extract_complete(&self, chars: usize, tokens: usize, truncated: bool) {
        self.bar.println(format!(
            "  {} Extracted {} chars, {} tokens{}",
            green("✓"),
            chars,
            tokens,
            if truncated { dim(" (truncated)") } else { String::new() }
        ));
        self.bar.set_message("waiting for candidates");
    }

    fn on_candidate_start(&self, index: usize, total: usize) {
        self.bar.set_message(format!("candidate {}/{}", index + 1, total));
    }

    fn on_candidate_complete(&self, index: usize, total: usize, tokens: usize) {
        self.bar.println(format!(
            "  {} Candidate {}/{}  {}",
            green("✓"),
            index + 1,
            total,
            dim(&format!("{tokens} tokens"))
        ));
    }

    fn on_candidate_error(&self, index: usize, total: usize, error: &str) {
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Candidate {}/{}  {}",
            red("✗"),
            index + 1,
            total,
            red(&msg)
        ));
    }

    fn on_summary_complete(&self, _chosen: usize, _tokens: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarize a PDF to stdout
  summarize report.pdf

  # Write a PDF summary
  summarize report.pdf -o summary.pdf

  # Short summary of a JSON document
  summarize data.json --max-length 60 --min-length 20

  # Inline text or stdin
  summarize --text "Long article text ..."
  cat article.txt | summarize -

  # Show the text that would be sent, without calling a model
  summarize report.pdf --show-extracted

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Same as --provider (openai, anthropic, gemini, ollama, azure)
  EDGEQUAKE_MODEL         Same as --model
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
"#;

/// Summarize PDF, JSON or plain text with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "summarize",
    version,
    about = "Summarize PDF, JSON or plain text with an LLM",
    long_about = "Extract text from a PDF or JSON document (local file or URL) or take text \
directly, and produce an abstractive summary whose length stays inside a configurable window.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF or JSON file path, HTTP/HTTPS URL, or `-` for stdin text.
    #[arg(conflicts_with = "text")]
    input: Option<String>,

    /// Summarize this text instead of a file.
    #[arg(long)]
    text: Option<String>,

    /// Write the summary to this file (.txt, .md or .pdf) instead of stdout.
    #[arg(short, long, env = "SUMMARIZE_OUTPUT")]
    output: Option<PathBuf>,

    /// Longest summary in word tokens (16–1024).
    #[arg(long, env = "SUMMARIZE_MAX_LENGTH", default_value_t = 150)]
    max_length: usize,

    /// Shortest summary in word tokens.
    #[arg(long, env = "SUMMARIZE_MIN_LENGTH", default_value_t = 30)]
    min_length: usize,

    /// Length penalty exponent (0.0–5.0); higher favours longer summaries.
    #[arg(long, env = "SUMMARIZE_LENGTH_PENALTY", default_value_t = 2.0)]
    length_penalty: f32,

    /// Candidate summaries to request (1–8).
    #[arg(long, env = "SUMMARIZE_NUM_BEAMS", default_value_t = 4)]
    num_beams: usize,

    /// Wait for every candidate instead of stopping at the first acceptable one.
    #[arg(long, env = "SUMMARIZE_NO_EARLY_STOPPING")]
    no_early_stopping: bool,

    /// Input budget in word tokens; longer input is truncated (16–8192).
    #[arg(long, env = "SUMMARIZE_MAX_INPUT_TOKENS", default_value_t = 512)]
    max_input_tokens: usize,

    /// PDF page selection: all, 5, 3-15, or a list such as 1-3,7,9.
    #[arg(long, env = "SUMMARIZE_PAGES", default_value = "all")]
    pages: PageSelection,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "SUMMARIZE_PASSWORD")]
    password: Option<String>,

    /// For JSON input, use only string values instead of the whole document.
    #[arg(long, env = "SUMMARIZE_JSON_STRINGS")]
    json_strings: bool,

    /// LLM model ID (e.g. gpt-4.1-nano).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_LLM_PROVIDER")]
    provider: Option<String>,

    /// Temperature of the first candidate (0.0–2.0).
    #[arg(long, env = "SUMMARIZE_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Retries per candidate on LLM failure (0–10).
    #[arg(long, env = "SUMMARIZE_MAX_RETRIES", default_value_t = 3,
          value_parser = clap::value_parser!(u32).range(0..=10))]
    max_retries: u32,

    /// Print the extracted (cleaned, truncated) text and exit; no model call.
    #[arg(long)]
    show_extracted: bool,

    /// Output structured JSON (SummaryOutput) instead of the summary text.
    #[arg(long, env = "SUMMARIZE_JSON")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "SUMMARIZE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SUMMARIZE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SUMMARIZE_QUIET")]
    quiet: bool,
}

/// Where the text comes from.
enum Source {
    Document(String),
    Inline(String),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.show_extracted;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let source = match (&cli.text, cli.input.as_deref()) {
        (Some(text), _) => Source::Inline(text.clone()),
        (None, Some("-")) => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read text from stdin")?;
            Source::Inline(text)
        }
        (None, Some(input)) => Source::Document(input.to_string()),
        (None, None) => anyhow::bail!("No input: pass a file, a URL, --text or `-` for stdin"),
    };

    if let Some(ref path) = cli.output {
        ExportFormat::from_path(path).context("Unsupported output file")?;
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn SummaryProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Extraction preview ───────────────────────────────────────────────
    if cli.show_extracted {
        let text = match source {
            Source::Document(ref input) => extract_text(input, &config)
                .await
                .context("Text extraction failed")?
                .0,
            Source::Inline(ref text) => clean_extracted(text),
        };
        let (kept, truncated) = truncate_tokens(&text, config.params.max_input_tokens);
        println!("{kept}");
        if truncated && !cli.quiet {
            eprintln!(
                "{}",
                dim(&format!(
                    "(truncated to {} tokens)",
                    config.params.max_input_tokens
                ))
            );
        }
        return Ok(());
    }

    // ── Summarize ────────────────────────────────────────────────────────
    let output: SummaryOutput = match (&source, &cli.output) {
        (Source::Document(input), Some(path)) => summarize_to_file(input, path, &config)
            .await
            .context("Summarization failed")?,
        (Source::Document(input), None) => summarize_file(input, &config)
            .await
            .context("Summarization failed")?,
        (Source::Inline(text), out) => {
            let output = summarize_text(text, &config)
                .await
                .context("Summarization failed")?;
            if let Some(path) = out {
                edgequake_docsketch::summarize::write_summary(path, &output.summary, None)
                    .await
                    .context("Failed to write summary")?;
            }
            output
        }
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if let Some(ref path) = cli.output {
        if !cli.quiet {
            eprintln!(
                "{}  {} tokens  {}ms  →  {}",
                green("✔"),
                output.stats.summary_tokens,
                output.stats.total_duration_ms,
                bold(&path.display().to_string()),
            );
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.summary.as_bytes())
            .context("Failed to write to stdout")?;
        handle.write_all(b"\n").ok();
    }

    if !cli.quiet && !cli.json {
        let s = &output.stats;
        eprintln!(
            "   {} tokens in{}  /  summary {} tokens  /  {} of {} candidates",
            dim(&s.input_tokens_used.to_string()),
            if s.truncated {
                dim(&format!(" (of {})", s.input_tokens))
            } else {
                String::new()
            },
            dim(&s.summary_tokens.to_string()),
            s.candidates_completed,
            s.candidates_requested,
        );
    }

    Ok(())
}

/// Map CLI args to `SummaryConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SummaryConfig> {
    if cli.min_length > cli.max_length {
        anyhow::bail!(
            "--min-length ({}) must not exceed --max-length ({})",
            cli.min_length,
            cli.max_length
        );
    }

    let mut builder = SummaryConfig::builder()
        .max_length(cli.max_length)
        .min_length(cli.min_length)
        .length_penalty(cli.length_penalty)
        .num_beams(cli.num_beams)
        .early_stopping(!cli.no_early_stopping)
        .max_input_tokens(cli.max_input_tokens)
        .pages(cli.pages.clone())
        .json_mode(if cli.json_strings {
            JsonTextMode::StringsOnly
        } else {
            JsonTextMode::Pretty
        })
        .temperature(cli.temperature)
        .max_retries(cli.max_retries);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_flag_parses_into_selection() {
        let cli = Cli::try_parse_from(["summarize", "report.pdf", "--pages", "2-4,8"]).unwrap();
        assert_eq!(cli.pages, PageSelection::Set(vec![2, 3, 4, 8]));

        let cli = Cli::try_parse_from(["summarize", "report.pdf"]).unwrap();
        assert_eq!(cli.pages, PageSelection::All);

        assert!(Cli::try_parse_from(["summarize", "report.pdf", "--pages", "0"]).is_err());
    }
}
