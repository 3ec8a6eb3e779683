//! Writing a summary to `.txt`, `.md` or `.pdf`.
//!
//! The PDF is assembled with pdfium: A4 pages, Helvetica 12pt, 10 mm line
//! height and 10 mm margins. Lines are wrapped against an approximate
//! Helvetica advance table; overflow starts a new page.

use crate::error::SummaryError;
use crate::pdf::bind_pdfium;
use crate::summarize::input::SourceKind;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

const MM: f32 = 72.0 / 25.4;
const A4_WIDTH: f32 = 595.28;
const A4_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 10.0 * MM;
const FONT_SIZE: f32 = 12.0;
const LINE_HEIGHT: f32 = 10.0 * MM;

/// Output file type for a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Text,
    Markdown,
    Pdf,
}

impl ExportFormat {
    /// Infer from the output extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, SummaryError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "txt" => Ok(ExportFormat::Text),
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(SummaryError::UnsupportedFileType { extension: ext }),
        }
    }
}

/// Plain text: the summary and one trailing newline.
pub fn render_text(summary: &str) -> String {
    format!("{}\n", summary.trim_end())
}

/// Markdown with a `# Summary` heading and optional source line.
pub fn render_markdown(summary: &str, source: Option<&str>) -> String {
    let mut out = String::from("# Summary\n\n");
    if let Some(src) = source {
        out.push_str(&format!("*Source: {}*\n\n", src));
    }
    out.push_str(summary.trim());
    out.push('\n');
    out
}

/// Write `summary` to `path`, picking the format from the extension.
pub async fn write_summary(
    path: impl AsRef<Path>,
    summary: &str,
    source: Option<&str>,
) -> Result<ExportFormat, SummaryError> {
    let path = path.as_ref();
    let format = ExportFormat::from_path(path)?;
    let bytes = match format {
        ExportFormat::Text => render_text(summary).into_bytes(),
        ExportFormat::Markdown => render_markdown(summary, source).into_bytes(),
        ExportFormat::Pdf => build_pdf(summary).await?,
    };
    write_atomic(path, &bytes).await?;
    info!("Wrote {:?} summary to {} ({} bytes)", format, path.display(), bytes.len());
    Ok(format)
}

/// Render `summary` to PDF bytes.
pub async fn build_pdf(summary: &str) -> Result<Vec<u8>, SummaryError> {
    let text = summary.to_string();
    tokio::task::spawn_blocking(move || build_pdf_blocking(&text))
        .await
        .map_err(|e| SummaryError::Internal(format!("PDF export task panicked: {}", e)))?
}

fn build_pdf_blocking(summary: &str) -> Result<Vec<u8>, SummaryError> {
    let fail = |e: PdfiumError| SummaryError::PdfExportFailed(format!("{:?}", e));

    let pdfium = bind_pdfium()?;
    let mut document = pdfium.create_new_pdf().map_err(fail)?;
    let font = document.fonts_mut().helvetica();

    let lines = wrap_lines(summary, A4_WIDTH - 2.0 * MARGIN, FONT_SIZE);
    let pages = paginate(&lines, lines_per_page());
    debug!("Summary PDF: {} lines on {} page(s)", lines.len(), pages.len());

    for page_lines in pages {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .map_err(fail)?;
        for (row, line) in page_lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            // Baseline sits FONT_SIZE below the top of the row.
            let y = A4_HEIGHT - MARGIN - row as f32 * LINE_HEIGHT - FONT_SIZE;
            page.objects_mut()
                .create_text_object(
                    PdfPoints::new(MARGIN),
                    PdfPoints::new(y),
                    line,
                    font,
                    PdfPoints::new(FONT_SIZE),
                )
                .map_err(fail)?;
        }
    }

    document.save_to_bytes().map_err(fail)
}

fn lines_per_page() -> usize {
    (((A4_HEIGHT - 2.0 * MARGIN) / LINE_HEIGHT).floor() as usize).max(1)
}

/// Approximate Helvetica advance of `c` in 1/1000 em.
fn advance(c: char) -> f32 {
    match c {
        'i' | 'j' | 'l' | '\'' | '|' => 222.0,
        ' ' | '.' | ',' | ':' | ';' | '!' | 'f' | 't' | 'I' | '/' | '[' | ']' | '(' | ')' => 278.0,
        'r' | '-' | '"' => 333.0,
        'm' | 'M' => 833.0,
        'w' | 'W' => 722.0,
        c if c.is_ascii_uppercase() => 667.0,
        c if c.is_ascii_digit() => 556.0,
        _ => 556.0,
    }
}

fn text_width(s: &str, font_size: f32) -> f32 {
    s.chars().map(advance).sum::<f32>() * font_size / 1000.0
}

/// Greedy word wrap to `max_width` points. Newlines start a new line;
/// words wider than a line are split.
fn wrap_lines(text: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if text_width(&candidate, font_size) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            // Hard-split a word that cannot fit on its own.
            for c in word.chars() {
                let mut next = current.clone();
                next.push(c);
                if text_width(&next, font_size) > max_width && !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current.push(c);
                } else {
                    current = next;
                }
            }
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn paginate(lines: &[String], per_page: usize) -> Vec<&[String]> {
    lines.chunks(per_page.max(1)).collect()
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SummaryError> {
    crate::fs::write_atomic(path, bytes)
        .await
        .map_err(|source| SummaryError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        })
}

/// Human label for a source in the Markdown header.
pub fn source_label(name: &str, kind: SourceKind) -> Option<String> {
    match kind {
        SourceKind::Text => None,
        _ => Some(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("a.TXT")).unwrap(), ExportFormat::Text);
        assert_eq!(ExportFormat::from_path(Path::new("a.markdown")).unwrap(), ExportFormat::Markdown);
        assert_eq!(ExportFormat::from_path(Path::new("out/a.pdf")).unwrap(), ExportFormat::Pdf);
        assert!(matches!(
            ExportFormat::from_path(Path::new("a.docx")),
            Err(SummaryError::UnsupportedFileType { .. })
        ));
    }

    #[test]
    fn markdown_layout() {
        assert_eq!(
            render_markdown("It works.", Some("paper.pdf")),
            "# Summary\n\n*Source: paper.pdf*\n\nIt works.\n"
        );
        assert_eq!(render_markdown("It works.", None), "# Summary\n\nIt works.\n");
        assert_eq!(render_text("It works.\n\n"), "It works.\n");
    }

    #[test]
    fn wrap_respects_width() {
        let text = "lorem ipsum dolor sit amet ".repeat(40);
        let width = A4_WIDTH - 2.0 * MARGIN;
        let lines = wrap_lines(&text, width, FONT_SIZE);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, FONT_SIZE) <= width, "too wide: {line}");
        }
        let rejoined = lines.join(" ");
        assert_eq!(rejoined.split_whitespace().count(), 200);
    }

    #[test]
    fn wrap_splits_overlong_words() {
        let word = "x".repeat(500);
        let lines = wrap_lines(&word, 100.0, FONT_SIZE);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn pagination() {
        let lines: Vec<String> = (0..60).map(|i| i.to_string()).collect();
        let per = lines_per_page();
        assert_eq!(per, 27);
        let pages = paginate(&lines, per);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2].len(), 6);
    }

    #[tokio::test]
    async fn writes_text_and_markdown_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("out").join("summary.txt");
        assert_eq!(write_summary(&txt, "Done.", None).await.unwrap(), ExportFormat::Text);
        assert_eq!(std::fs::read_to_string(&txt).unwrap(), "Done.\n");
        assert!(!dir.path().join("out").join("summary.txt.tmp").exists());

        let md = dir.path().join("summary.md");
        write_summary(&md, "Done.", Some("a.json")).await.unwrap();
        assert!(std::fs::read_to_string(&md).unwrap().starts_with("# Summary"));
    }
}
