//! Input resolution: classify a path or URL and make it available locally.
//!
//! Only `.pdf` and `.json` files are accepted. URLs are downloaded into a
//! `TempDir` kept alive by [`ResolvedInput`]; when the URL path carries no
//! usable extension the body is sniffed instead.

use crate::error::SummaryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// The kind of document a summary is made from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    Pdf,
    Json,
    /// Inline text (`--text` or stdin).
    Text,
}

impl SourceKind {
    /// Classify by file extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Result<Self, SummaryError> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Ok(SourceKind::Pdf),
            "json" => Ok(SourceKind::Json),
            other => Err(SummaryError::UnsupportedFileType {
                extension: other.to_string(),
            }),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, SummaryError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_extension(&ext)
    }

    /// Guess the kind from content: `%PDF` magic or parseable JSON.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            return Some(SourceKind::Pdf);
        }
        if serde_json::from_slice::<serde_json::Value>(bytes).is_ok() {
            return Some(SourceKind::Json);
        }
        None
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Pdf => "pdf",
            SourceKind::Json => "json",
            SourceKind::Text => "text",
        })
    }
}

/// A classified input available on the local file system.
pub enum ResolvedInput {
    Local {
        path: PathBuf,
        kind: SourceKind,
    },
    /// Downloaded into a temp dir that lives as long as this value.
    Downloaded {
        path: PathBuf,
        kind: SourceKind,
        _temp_dir: TempDir,
    },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local { path, .. } | ResolvedInput::Downloaded { path, .. } => path,
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            ResolvedInput::Local { kind, .. } | ResolvedInput::Downloaded { kind, .. } => *kind,
        }
    }
}

/// Check if the input string looks like an HTTP(S) URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a path or URL, classifying it and validating PDF magic bytes.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, SummaryError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else if input.contains("://") || input.trim().is_empty() {
        Err(SummaryError::InvalidInput {
            input: input.to_string(),
        })
    } else {
        resolve_local(input)
    }
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, SummaryError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(SummaryError::FileNotFound { path });
    }
    let kind = SourceKind::from_path(&path)?;

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            if kind == SourceKind::Pdf {
                use std::io::Read;
                let mut magic = [0u8; 4];
                if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                    return Err(SummaryError::NotAPdf { path, magic });
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(SummaryError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(SummaryError::FileNotFound { path });
        }
    }

    debug!("Resolved local {} input: {}", kind, path.display());
    Ok(ResolvedInput::Local { path, kind })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, SummaryError> {
    info!("Downloading {}", url);

    let failed = |reason: String| SummaryError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            SummaryError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

    let filename = url_filename(url);
    let kind = match filename.as_deref().and_then(|f| Path::new(f).extension()) {
        Some(ext) => SourceKind::from_extension(&ext.to_string_lossy())?,
        None => SourceKind::sniff(&bytes).ok_or_else(|| SummaryError::UnsupportedFileType {
            extension: String::new(),
        })?,
    };
    let filename = filename.unwrap_or_else(|| format!("downloaded.{kind}"));

    let temp_dir = TempDir::new().map_err(|e| SummaryError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);
    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| SummaryError::Internal(format!("Failed to write temp file: {}", e)))?;

    if kind == SourceKind::Pdf && bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(SummaryError::NotAPdf {
            path: file_path,
            magic,
        });
    }

    info!("Downloaded {} bytes to {}", bytes.len(), file_path.display());
    Ok(ResolvedInput::Downloaded {
        path: file_path,
        kind,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of a URL, if it has an extension.
fn url_filename(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if !last.is_empty() && last.contains('.') {
        Some(last.to_string())
    } else {
        None
    }
}
