//! Text extraction from PDF and JSON sources.
//!
//! PDF text comes from pdfium's text layer, one page at a time, inside
//! `spawn_blocking`. JSON is parsed and re-serialised so the model sees a
//! stable layout regardless of the source formatting.

use crate::config::{JsonTextMode, PageSelection};
use crate::error::SummaryError;
use crate::pdf::bind_pdfium;
use crate::summarize::input::{ResolvedInput, SourceKind};
use pdfium_render::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Raw text pulled from a source, before cleanup.
#[derive(Debug, Clone, Default)]
pub struct ExtractedText {
    pub text: String,
    /// PDF page count.
    pub page_count: Option<usize>,
    /// 1-indexed pages that contributed text.
    pub pages_used: Vec<usize>,
}

/// Extract text from a resolved input according to its kind.
pub async fn extract(
    input: &ResolvedInput,
    pages: &PageSelection,
    password: Option<&str>,
    json_mode: JsonTextMode,
) -> Result<ExtractedText, SummaryError> {
    match input.kind() {
        SourceKind::Pdf => extract_pdf(input.path(), pages, password).await,
        SourceKind::Json => extract_json(input.path(), json_mode).await,
        SourceKind::Text => {
            let text = tokio::fs::read_to_string(input.path())
                .await
                .map_err(|e| read_error(input.path(), e))?;
            Ok(ExtractedText {
                text,
                ..Default::default()
            })
        }
    }
}

fn read_error(path: &Path, e: std::io::Error) -> SummaryError {
    match e.kind() {
        std::io::ErrorKind::NotFound => SummaryError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => SummaryError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => SummaryError::Internal(format!("reading {}: {}", path.display(), e)),
    }
}

// ── JSON ─────────────────────────────────────────────────────────────────────

/// Read and flatten a JSON file.
pub async fn extract_json(path: &Path, mode: JsonTextMode) -> Result<ExtractedText, SummaryError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| read_error(path, e))?;
    let text = json_to_text(&raw, mode).map_err(|e| SummaryError::InvalidJson {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    debug!("JSON {} → {} chars ({:?})", path.display(), text.len(), mode);
    Ok(ExtractedText {
        text,
        ..Default::default()
    })
}

/// Flatten a JSON document to text.
///
/// `Pretty` re-serialises with 2-space indentation; `StringsOnly` keeps the
/// string leaves in document order, one per line.
pub fn json_to_text(raw: &str, mode: JsonTextMode) -> Result<String, serde_json::Error> {
    let value: Value = serde_json::from_str(raw)?;
    match mode {
        JsonTextMode::Pretty => serde_json::to_string_pretty(&value),
        JsonTextMode::StringsOnly => {
            let mut leaves = Vec::new();
            collect_strings(&value, &mut leaves);
            Ok(leaves.join("\n"))
        }
    }
}

fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) if !s.trim().is_empty() => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

// ── PDF ──────────────────────────────────────────────────────────────────────

/// Extract the text layer of the selected pages.
pub async fn extract_pdf(
    path: &Path,
    pages: &PageSelection,
    password: Option<&str>,
) -> Result<ExtractedText, SummaryError> {
    let path = path.to_path_buf();
    let pages = pages.clone();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || extract_pdf_blocking(&path, &pages, password.as_deref()))
        .await
        .map_err(|e| SummaryError::Internal(format!("Extraction task panicked: {}", e)))?
}

fn extract_pdf_blocking(
    pdf_path: &Path,
    selection: &PageSelection,
    password: Option<&str>,
) -> Result<ExtractedText, SummaryError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| load_error(pdf_path.to_path_buf(), password.is_some(), e))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let indices = selection.to_indices(total_pages);
    if indices.is_empty() {
        return Err(SummaryError::PageOutOfRange { total: total_pages });
    }

    let mut parts = Vec::with_capacity(indices.len());
    let mut pages_used = Vec::with_capacity(indices.len());
    for idx in indices {
        let page = match pages.get(idx as u16) {
            Ok(p) => p,
            Err(e) => {
                warn!("Skipping page {}: {:?}", idx + 1, e);
                continue;
            }
        };
        let text = match page.text() {
            Ok(t) => t.all(),
            Err(e) => {
                warn!("Page {} has no readable text layer: {:?}", idx + 1, e);
                continue;
            }
        };
        debug!("Page {}: {} chars", idx + 1, text.len());
        if !text.trim().is_empty() {
            parts.push(text);
            pages_used.push(idx + 1);
        }
    }

    Ok(ExtractedText {
        text: parts.join("\n\n"),
        page_count: Some(total_pages),
        pages_used,
    })
}

fn load_error(path: PathBuf, had_password: bool, e: PdfiumError) -> SummaryError {
    let detail = format!("{:?}", e);
    if detail.to_lowercase().contains("password") {
        if had_password {
            SummaryError::WrongPassword { path }
        } else {
            SummaryError::PasswordRequired { path }
        }
    } else {
        SummaryError::CorruptPdf { path, detail }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_json_uses_two_space_indent() {
        let text = json_to_text(r#"{"title":"Report","tags":["a","b"]}"#, JsonTextMode::Pretty).unwrap();
        assert_eq!(
            text,
            "{\n  \"title\": \"Report\",\n  \"tags\": [\n    \"a\",\n    \"b\"\n  ]\n}"
        );
    }

    #[test]
    fn strings_only_keeps_leaves_in_order() {
        let raw = r#"{"title":"Report","n":3,"body":{"p":["First.","  ","Second."]}}"#;
        let text = json_to_text(raw, JsonTextMode::StringsOnly).unwrap();
        assert_eq!(text, "Report\nFirst.\nSecond.");
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(json_to_text("{not json", JsonTextMode::Pretty).is_err());
    }

    #[tokio::test]
    async fn extract_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, "[1, \"two\"]").unwrap();
        let out = extract_json(&path, JsonTextMode::Pretty).await.unwrap();
        assert_eq!(out.text, "[\n  1,\n  \"two\"\n]");
        assert!(out.page_count.is_none());

        std::fs::write(&path, "[1,").unwrap();
        let err = extract_json(&path, JsonTextMode::Pretty).await.unwrap_err();
        assert!(matches!(err, SummaryError::InvalidJson { .. }));
    }
}
