//! Rendering DOT through Graphviz and writing diagram files.
//!
//! Layout is delegated to the `dot` program: the DOT text is piped to
//! `dot -T<format>` and the rendered bytes are read back from stdout. The
//! child is killed if the future is dropped or the timeout fires.

use crate::config::DiagramConfig;
use crate::error::ErdError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Output format for a rendered diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Pdf,
    Svg,
    Jpeg,
    /// The DOT source itself; no Graphviz call.
    Dot,
}

impl ImageFormat {
    /// Value passed to `dot -T`.
    pub fn graphviz_name(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Pdf => "pdf",
            ImageFormat::Svg => "svg",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Dot => "dot",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Dot => "gv",
            other => other.graphviz_name(),
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Pdf => "application/pdf",
            ImageFormat::Svg => "image/svg+xml",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Dot => "text/vnd.graphviz",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.graphviz_name())
    }
}

impl FromStr for ImageFormat {
    type Err = ErdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "pdf" => Ok(ImageFormat::Pdf),
            "svg" => Ok(ImageFormat::Svg),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
            "dot" | "gv" => Ok(ImageFormat::Dot),
            other => Err(ErdError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// A diagram file written by [`write_diagram`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub format: ImageFormat,
    pub bytes: usize,
}

/// Render DOT source to the requested format.
pub async fn render(dot: &str, format: ImageFormat, config: &DiagramConfig) -> Result<Vec<u8>, ErdError> {
    if format == ImageFormat::Dot {
        return Ok(dot.as_bytes().to_vec());
    }

    let program = config.dot_binary.display().to_string();
    debug!("Rendering {} via {} -T{}", format, program, format.graphviz_name());

    let mut child = Command::new(&config.dot_binary)
        .arg(format!("-T{}", format.graphviz_name()))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ErdError::RendererUnavailable {
            program: program.clone(),
            detail: e.to_string(),
        })?;

    let mut stdin = child.stdin.take().ok_or_else(|| ErdError::RenderFailed {
        format: format.to_string(),
        detail: "renderer stdin unavailable".into(),
    })?;
    let source = dot.as_bytes().to_vec();
    // Feed stdin concurrently so a large output cannot deadlock the pipe.
    let writer = tokio::spawn(async move {
        let result = stdin.write_all(&source).await;
        drop(stdin);
        result
    });

    let secs = config.render_timeout_secs;
    let output = tokio::time::timeout(Duration::from_secs(secs), child.wait_with_output())
        .await
        .map_err(|_| ErdError::RenderTimeout {
            format: format.to_string(),
            secs,
        })?
        .map_err(|e| ErdError::RenderFailed {
            format: format.to_string(),
            detail: e.to_string(),
        })?;

    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            return Err(ErdError::RenderFailed {
                format: format.to_string(),
                detail: format!("writing DOT to renderer failed: {e}"),
            })
        }
        Err(e) => {
            return Err(ErdError::RenderFailed {
                format: format.to_string(),
                detail: format!("writer task panicked: {e}"),
            })
        }
    }

    if !output.status.success() {
        return Err(ErdError::RenderFailed {
            format: format.to_string(),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    if output.stdout.is_empty() {
        return Err(ErdError::RenderFailed {
            format: format.to_string(),
            detail: "renderer produced no output".into(),
        });
    }

    debug!("Rendered {} → {} bytes", format, output.stdout.len());
    Ok(output.stdout)
}

/// Render and write `{stem}.{ext}` for every format.
///
/// Files are written atomically (temp file + rename).
pub async fn write_diagram(
    dot: &str,
    stem: &Path,
    formats: &[ImageFormat],
    config: &DiagramConfig,
) -> Result<Vec<ExportedFile>, ErdError> {
    let mut written = Vec::with_capacity(formats.len());
    for &format in formats {
        let bytes = render(dot, format, config).await?;
        let path = with_extension(stem, format.extension());
        write_atomic(&path, &bytes).await?;
        info!("Wrote {} ({} bytes)", path.display(), bytes.len());
        written.push(ExportedFile {
            path,
            format,
            bytes: bytes.len(),
        });
    }
    Ok(written)
}

/// `er_diagram` + `png` → `er_diagram.png`; keeps dots already in the stem.
fn with_extension(stem: &Path, ext: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ErdError> {
    crate::fs::write_atomic(path, bytes)
        .await
        .map_err(|source| ErdError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats() {
        assert_eq!("PNG".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert_eq!("jpg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!("gv".parse::<ImageFormat>().unwrap(), ImageFormat::Dot);
        assert!(matches!(
            "bmp".parse::<ImageFormat>(),
            Err(ErdError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn extension_keeps_existing_dots() {
        assert_eq!(
            with_extension(Path::new("out/er.v2"), "png"),
            PathBuf::from("out/er.v2.png")
        );
    }

    #[tokio::test]
    async fn dot_format_needs_no_renderer() {
        let config = DiagramConfig::builder()
            .dot_binary("/definitely/not/graphviz")
            .build()
            .unwrap();
        let bytes = render("digraph {}\n", ImageFormat::Dot, &config).await.unwrap();
        assert_eq!(bytes, b"digraph {}\n");
    }

    #[tokio::test]
    async fn missing_renderer_is_reported() {
        let config = DiagramConfig::builder()
            .dot_binary("/definitely/not/graphviz")
            .build()
            .unwrap();
        let err = render("digraph {}\n", ImageFormat::Png, &config).await.unwrap_err();
        assert!(matches!(err, ErdError::RendererUnavailable { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn writes_dot_file_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("nested").join("er_diagram");
        let files = write_diagram("digraph {}\n", &stem, &[ImageFormat::Dot], &DiagramConfig::default())
            .await
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, dir.path().join("nested").join("er_diagram.gv"));
        let written = std::fs::read_to_string(&files[0].path).unwrap();
        assert_eq!(written, "digraph {}\n");
        assert!(!dir.path().join("nested").join("er_diagram.gv.tmp").exists());
    }
}
