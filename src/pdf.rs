//! pdfium binding.
//!
//! Resolution order: `PDFIUM_LIB_PATH` (a library file or the directory
//! holding it), then the platform library next to the executable's working
//! directory, then the system library. A fresh binding is created per
//! blocking call.

use crate::error::SummaryError;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::debug;

/// Bind to a pdfium library.
pub fn bind_pdfium() -> Result<Pdfium, SummaryError> {
    if let Ok(raw) = std::env::var("PDFIUM_LIB_PATH") {
        if !raw.is_empty() {
            let path = PathBuf::from(&raw);
            let lib = if path.is_dir() {
                PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(&path))
            } else {
                path
            };
            debug!("Binding pdfium from PDFIUM_LIB_PATH: {}", lib.display());
            return Pdfium::bind_to_library(&lib)
                .map(Pdfium::new)
                .map_err(|e| SummaryError::PdfiumBindingFailed(format!("{}: {:?}", lib.display(), e)));
        }
    }

    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| SummaryError::PdfiumBindingFailed(format!("{:?}", e)))
}
