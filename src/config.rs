//! Configuration types for diagram generation and summarization.
//!
//! Each pipeline has one config struct built through a builder:
//! [`DiagramConfig`] for the ER generator and [`SummaryConfig`] for the
//! summarizer. Setters clamp numeric knobs into their documented ranges;
//! `build()` rejects combinations that cannot work (e.g. `min_length >
//! max_length`).

use crate::error::{ErdError, SummaryError};
use crate::progress::ProgressCallback;
use crate::summarize::generate::SummaryBackend;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

// ── Diagram configuration ────────────────────────────────────────────────

/// How entity attributes are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttributeStyle {
    /// Attributes listed as rows under the entity name. (default)
    #[default]
    Table,
    /// One ellipse per attribute, linked to its entity.
    Satellite,
}

/// Graphviz `rankdir`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RankDir {
    /// Left to right. (default)
    #[default]
    LeftRight,
    TopBottom,
    RightLeft,
    BottomTop,
}

impl RankDir {
    pub fn as_str(self) -> &'static str {
        match self {
            RankDir::LeftRight => "LR",
            RankDir::TopBottom => "TB",
            RankDir::RightLeft => "RL",
            RankDir::BottomTop => "BT",
        }
    }
}

impl FromStr for RankDir {
    type Err = ErdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LR" => Ok(RankDir::LeftRight),
            "TB" => Ok(RankDir::TopBottom),
            "RL" => Ok(RankDir::RightLeft),
            "BT" => Ok(RankDir::BottomTop),
            other => Err(ErdError::InvalidConfig(format!(
                "rankdir must be LR, TB, RL or BT, got '{other}'"
            ))),
        }
    }
}

/// What to do with manual relationships that name undefined entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReferencePolicy {
    /// Reject them. (default)
    #[default]
    Strict,
    /// Add the missing endpoints as attribute-less entities.
    Implicit,
}

/// Configuration for ER diagram generation.
///
/// # Example
/// ```rust
/// use edgequake_docsketch::{AttributeStyle, DiagramConfig};
///
/// let config = DiagramConfig::builder()
///     .attribute_style(AttributeStyle::Satellite)
///     .size("10,6")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramConfig {
    /// Attribute rendering. Default: [`AttributeStyle::Table`].
    pub attribute_style: AttributeStyle,

    /// Layout direction. Default: left to right.
    pub rankdir: RankDir,

    /// Graphviz `size` attribute in inches, `"W,H"`. Default: `"8,8"`.
    pub size: String,

    /// Graphviz `ratio` attribute. Default: `"fill"`.
    pub ratio: String,

    /// Label link ends with `1`/`N`/`M` from the cardinality tag. Default: true.
    pub annotate_cardinality: bool,

    /// Handling of manual relationships to undefined entities. Default: strict.
    pub reference_policy: ReferencePolicy,

    /// Graphviz executable. Default: `dot` (resolved through `PATH`).
    pub dot_binary: PathBuf,

    /// Per-render timeout in seconds. Default: 30.
    pub render_timeout_secs: u64,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            attribute_style: AttributeStyle::default(),
            rankdir: RankDir::default(),
            size: "8,8".to_string(),
            ratio: "fill".to_string(),
            annotate_cardinality: true,
            reference_policy: ReferencePolicy::default(),
            dot_binary: PathBuf::from("dot"),
            render_timeout_secs: 30,
        }
    }
}

impl DiagramConfig {
    pub fn builder() -> DiagramConfigBuilder {
        DiagramConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`DiagramConfig`].
#[derive(Debug)]
pub struct DiagramConfigBuilder {
    config: DiagramConfig,
}

impl DiagramConfigBuilder {
    pub fn attribute_style(mut self, style: AttributeStyle) -> Self {
        self.config.attribute_style = style;
        self
    }

    pub fn rankdir(mut self, rankdir: RankDir) -> Self {
        self.config.rankdir = rankdir;
        self
    }

    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.config.size = size.into();
        self
    }

    pub fn ratio(mut self, ratio: impl Into<String>) -> Self {
        self.config.ratio = ratio.into();
        self
    }

    pub fn annotate_cardinality(mut self, v: bool) -> Self {
        self.config.annotate_cardinality = v;
        self
    }

    pub fn reference_policy(mut self, policy: ReferencePolicy) -> Self {
        self.config.reference_policy = policy;
        self
    }

    pub fn dot_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.dot_binary = path.into();
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DiagramConfig, ErdError> {
        let c = &self.config;
        let valid_size = c
            .size
            .split_once(',')
            .map(|(w, h)| w.trim().parse::<f32>().is_ok() && h.trim().parse::<f32>().is_ok())
            .unwrap_or_else(|| c.size.trim().parse::<f32>().is_ok());
        if !valid_size {
            return Err(ErdError::InvalidConfig(format!(
                "size must be \"W,H\" or a single number in inches, got '{}'",
                c.size
            )));
        }
        if c.dot_binary.as_os_str().is_empty() {
            return Err(ErdError::InvalidConfig("dot binary path is empty".into()));
        }
        Ok(self.config)
    }
}

// ── Summary configuration ────────────────────────────────────────────────

/// Bounded generation parameters for one summary.
///
/// Lengths are counted in word tokens (see [`crate::summarize::tokens`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryParams {
    /// Longest acceptable summary. Range 16–1024. Default: 150.
    pub max_length: usize,
    /// Shortest acceptable summary. Range 0–`max_length`. Default: 30.
    pub min_length: usize,
    /// Exponent applied to the length ratio when ranking candidates.
    /// Values above 0 favour longer summaries. Range 0.0–5.0. Default: 2.0.
    pub length_penalty: f32,
    /// Number of candidate summaries requested. Range 1–8. Default: 4.
    pub num_beams: usize,
    /// Stop at the first candidate that lands inside the length window. Default: true.
    pub early_stopping: bool,
    /// Input budget; longer text is truncated before generation. Range 16–8192. Default: 512.
    pub max_input_tokens: usize,
    /// Prepended to the input text. Default: `"summarize: "`.
    pub task_prefix: String,
}

impl SummaryParams {
    pub const MAX_LENGTH_RANGE: (usize, usize) = (16, 1024);
    pub const LENGTH_PENALTY_RANGE: (f32, f32) = (0.0, 5.0);
    pub const NUM_BEAMS_RANGE: (usize, usize) = (1, 8);
    pub const MAX_INPUT_TOKENS_RANGE: (usize, usize) = (16, 8192);

    /// Whether `tokens` falls inside the `[min_length, max_length]` window.
    pub fn in_range(&self, tokens: usize) -> bool {
        tokens >= self.min_length && tokens <= self.max_length
    }
}

impl Default for SummaryParams {
    fn default() -> Self {
        Self {
            max_length: 150,
            min_length: 30,
            length_penalty: 2.0,
            num_beams: 4,
            early_stopping: true,
            max_input_tokens: 512,
            task_prefix: "summarize: ".to_string(),
        }
    }
}

/// How JSON input is turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JsonTextMode {
    /// Re-serialise the whole document pretty-printed. (default)
    #[default]
    Pretty,
    /// Only the string leaves, one per line.
    StringsOnly,
}

/// Configuration for a summarization run.
///
/// # Example
/// ```rust
/// use edgequake_docsketch::SummaryConfig;
///
/// let config = SummaryConfig::builder()
///     .max_length(80)
///     .min_length(20)
///     .num_beams(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.params.max_length, 80);
/// ```
#[derive(Clone)]
pub struct SummaryConfig {
    /// Generation parameters.
    pub params: SummaryParams,

    /// LLM model identifier, e.g. "gpt-4.1-nano". If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed backend. Takes precedence over every provider setting.
    pub backend: Option<Arc<dyn SummaryBackend>>,

    /// Sampling temperature of the first candidate. Default: 0.3.
    pub temperature: f32,

    /// Temperature added per further candidate so beams differ. Default: 0.15.
    pub beam_temperature_step: f32,

    /// Completion token cap per request. If None, derived from `max_length`.
    pub max_tokens: Option<usize>,

    /// Maximum retry attempts per candidate on a failed call. Range 0–10. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Concurrent candidate requests. Default: 0 (one per beam).
    pub concurrency: usize,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// PDF pages to extract. Default: all.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// JSON text extraction mode. Default: pretty.
    pub json_mode: JsonTextMode,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-request LLM timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            params: SummaryParams::default(),
            model: None,
            provider_name: None,
            provider: None,
            backend: None,
            temperature: 0.3,
            beam_temperature_step: 0.15,
            max_tokens: None,
            max_retries: 3,
            retry_backoff_ms: 500,
            concurrency: 0,
            system_prompt: None,
            pages: PageSelection::default(),
            password: None,
            json_mode: JsonTextMode::default(),
            download_timeout_secs: 120,
            api_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SummaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryConfig")
            .field("params", &self.params)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("temperature", &self.temperature)
            .field("max_retries", &self.max_retries)
            .field("concurrency", &self.concurrency)
            .field("pages", &self.pages)
            .field("json_mode", &self.json_mode)
            .finish()
    }
}

impl SummaryConfig {
    /// Upper bound for [`SummaryConfigBuilder::max_retries`].
    pub const MAX_RETRIES: u32 = 10;

    pub fn builder() -> SummaryConfigBuilder {
        SummaryConfigBuilder {
            config: Self::default(),
        }
    }

    /// Effective number of concurrent candidate requests.
    pub fn effective_concurrency(&self) -> usize {
        if self.concurrency == 0 {
            self.params.num_beams.max(1)
        } else {
            self.concurrency
        }
    }

    /// Completion token cap sent with each request: `2 * max_length + 64`
    /// unless set explicitly.
    pub fn effective_max_tokens(&self) -> usize {
        self.max_tokens.unwrap_or(self.params.max_length * 2 + 64)
    }

    /// Temperature used for candidate `index`, capped at 2.0.
    pub fn candidate_temperature(&self, index: usize) -> f32 {
        (self.temperature + self.beam_temperature_step * index as f32).min(2.0)
    }

    /// Delay before retry `attempt` (1-based): `retry_backoff_ms * 2^(attempt-1)`,
    /// saturating instead of overflowing.
    pub fn retry_delay_ms(&self, attempt: u32) -> u64 {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        self.retry_backoff_ms.saturating_mul(factor)
    }
}

/// Builder for [`SummaryConfig`].
#[derive(Debug)]
pub struct SummaryConfigBuilder {
    config: SummaryConfig,
}

impl SummaryConfigBuilder {
    pub fn max_length(mut self, n: usize) -> Self {
        let (lo, hi) = SummaryParams::MAX_LENGTH_RANGE;
        self.config.params.max_length = n.clamp(lo, hi);
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.config.params.min_length = n;
        self
    }

    pub fn length_penalty(mut self, p: f32) -> Self {
        let (lo, hi) = SummaryParams::LENGTH_PENALTY_RANGE;
        self.config.params.length_penalty = if p.is_finite() { p.clamp(lo, hi) } else { lo };
        self
    }

    pub fn num_beams(mut self, n: usize) -> Self {
        let (lo, hi) = SummaryParams::NUM_BEAMS_RANGE;
        self.config.params.num_beams = n.clamp(lo, hi);
        self
    }

    pub fn early_stopping(mut self, v: bool) -> Self {
        self.config.params.early_stopping = v;
        self
    }

    pub fn max_input_tokens(mut self, n: usize) -> Self {
        let (lo, hi) = SummaryParams::MAX_INPUT_TOKENS_RANGE;
        self.config.params.max_input_tokens = n.clamp(lo, hi);
        self
    }

    pub fn task_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.params.task_prefix = prefix.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn SummaryBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn beam_temperature_step(mut self, step: f32) -> Self {
        self.config.beam_temperature_step = step.clamp(0.0, 1.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n.max(16));
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(SummaryConfig::MAX_RETRIES);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn json_mode(mut self, mode: JsonTextMode) -> Self {
        self.config.json_mode = mode;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SummaryConfig, SummaryError> {
        let p = &self.config.params;
        if p.min_length > p.max_length {
            return Err(SummaryError::InvalidConfig(format!(
                "min_length ({}) must not exceed max_length ({})",
                p.min_length, p.max_length
            )));
        }
        if p.task_prefix.contains('\0') {
            return Err(SummaryError::InvalidConfig(
                "task prefix must not contain NUL".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Page selection ───────────────────────────────────────────────────────

/// Specifies which pages of a PDF to extract text from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// All pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

/// Parses `all`, `N`, `A-B` or a comma list mixing both (`1-3,7,10-12`).
///
/// A list is flattened into [`PageSelection::Set`]; a lone number or range
/// keeps its own variant. Pages are 1-indexed.
impl FromStr for PageSelection {
    type Err = SummaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }

        let items: Vec<&str> = s.split(',').map(str::trim).collect();
        if let [item] = items.as_slice() {
            let (start, end, is_range) = parse_page_item(item)?;
            return Ok(if is_range {
                PageSelection::Range(start, end)
            } else {
                PageSelection::Single(start)
            });
        }

        let mut pages = Vec::new();
        for item in items.into_iter().filter(|i| !i.is_empty()) {
            let (start, end, _) = parse_page_item(item)?;
            pages.extend(start..=end);
        }
        if pages.is_empty() {
            return Err(invalid_pages(s, "no pages listed"));
        }
        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Set(pages))
    }
}

/// `N` or `A-B` as `(start, end, is_range)`.
fn parse_page_item(item: &str) -> Result<(usize, usize, bool), SummaryError> {
    let page = |raw: &str| -> Result<usize, SummaryError> {
        match raw.trim().parse::<usize>() {
            Ok(0) => Err(invalid_pages(item, "pages are 1-indexed")),
            Ok(n) => Ok(n),
            Err(_) => Err(invalid_pages(item, "not a page number")),
        }
    };
    match item.split_once('-') {
        Some((a, b)) => {
            let (start, end) = (page(a)?, page(b)?);
            if start > end {
                return Err(invalid_pages(item, "range start is after its end"));
            }
            Ok((start, end, true))
        }
        None => {
            let p = page(item)?;
            Ok((p, p, false))
        }
    }
}

fn invalid_pages(input: &str, reason: &str) -> SummaryError {
    SummaryError::InvalidConfig(format!("invalid page selection '{input}': {reason}"))
}
