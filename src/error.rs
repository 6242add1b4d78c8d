//! Error types for the isomto library.
//!
//! A single [`MtoError`] enum covers every failure in the pipeline, but each
//! variant belongs to exactly one [`ErrorKind`] so callers can branch on the
//! *category* of a failure (reject the upload vs. blame the server) without
//! matching on message text. The HTTP layer maps [`ErrorKind::Validation`]
//! to 400 and everything else to 500.

use std::path::PathBuf;
use thiserror::Error;

/// Broad failure category of an [`MtoError`].
///
/// The service surfaces only two of these to clients (bad request vs.
/// internal failure), but tests and library callers assert on the full set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The upload itself was malformed or disallowed. Rejected before any
    /// file is created.
    Validation,
    /// The fixed crop constants are defective. Caught at startup by
    /// [`crate::config::ServiceConfigBuilder::build`]; seeing this per
    /// request means the process is misconfigured.
    Geometry,
    /// The uploaded PDF is unreadable, empty, or yields a degenerate crop.
    Document,
    /// The external vision service call failed (transport, auth, quota).
    Extraction,
    /// Everything else: I/O on our own storage, task panics.
    Internal,
}

/// All errors returned by the isomto library.
#[derive(Debug, Error)]
pub enum MtoError {
    // ── Upload validation ─────────────────────────────────────────────────
    /// The claimed filename does not end in `.pdf`.
    #[error("Unsupported upload '{filename}': only PDF files are accepted")]
    NotAPdfUpload { filename: String },

    /// The claimed filename has no usable base name (empty, or only an
    /// extension).
    #[error("Upload filename '{filename}' has no usable base name")]
    UnusableFilename { filename: String },

    /// The request body was not a usable multipart upload.
    #[error("Malformed upload request: {0}")]
    BadUpload(String),

    // ── Crop geometry ─────────────────────────────────────────────────────
    /// Reference layout dimensions must be strictly positive.
    #[error("Invalid crop geometry: non-positive reference dimension ({width} x {height})")]
    NonPositiveReference { width: f64, height: f64 },

    /// The normalized crop box failed validation. Carries the computed
    /// fractions so a bad constant can be diagnosed from the message alone.
    #[error(
        "Invalid crop geometry: normalized box x0={x0:.4} x1={x1:.4} y0={y0:.4} y1={y1:.4} \
         must satisfy 0 <= x0 < x1 <= 1 and 0 <= y0 < y1 <= 1"
    )]
    InvalidCropBox { x0: f64, x1: f64, y0: f64, y1: f64 },

    // ── Document ──────────────────────────────────────────────────────────
    /// The PDF could not be parsed at all.
    #[error("PDF '{path}' is unreadable: {detail}")]
    UnreadablePdf { path: PathBuf, detail: String },

    /// The document contains no pages.
    #[error("PDF '{path}' is empty (zero pages)")]
    EmptyPdf { path: PathBuf },

    /// The crop rect computed for this page is degenerate or non-finite.
    #[error("Invalid crop for {page_width:.1} x {page_height:.1} pt page: {detail}")]
    InvalidCrop {
        page_width: f64,
        page_height: f64,
        detail: String,
    },

    /// The crop rect does not overlap the page at all.
    #[error("Crop region lies outside the page ({page_width:.1} x {page_height:.1} pt)")]
    CropOutsidePage { page_width: f64, page_height: f64 },

    /// pdfium failed to render the page bitmap.
    #[error("Rasterisation failed for '{path}': {detail}")]
    RasterisationFailed { path: PathBuf, detail: String },

    // ── Extraction ────────────────────────────────────────────────────────
    /// The crop image is missing or not a PNG. Checked before any network
    /// call is made.
    #[error("Crop image '{path}' is missing or not a PNG")]
    BadCropImage { path: PathBuf },

    /// The vision API transport failed (connect, TLS, timeout).
    #[error("Vision API request failed: {detail}")]
    ExtractionRequestFailed { detail: String },

    /// The vision API answered with a non-success status.
    #[error("Vision API returned HTTP {status}: {detail}")]
    ExtractionApiError { status: u16, detail: String },

    /// The vision API reply carried no message content.
    #[error("Vision API reply carried no content")]
    EmptyExtractionReply,

    // ── I/O ───────────────────────────────────────────────────────────────
    /// Could not read or write one of our own staging files.
    #[error("Storage I/O failed for '{path}': {source}")]
    StorageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config ────────────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (task panic, poisoned state).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MtoError {
    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MtoError::NotAPdfUpload { .. }
            | MtoError::UnusableFilename { .. }
            | MtoError::BadUpload(_) => ErrorKind::Validation,
            MtoError::NonPositiveReference { .. } | MtoError::InvalidCropBox { .. } => {
                ErrorKind::Geometry
            }
            MtoError::UnreadablePdf { .. }
            | MtoError::EmptyPdf { .. }
            | MtoError::InvalidCrop { .. }
            | MtoError::CropOutsidePage { .. }
            | MtoError::RasterisationFailed { .. } => ErrorKind::Document,
            MtoError::BadCropImage { .. }
            | MtoError::ExtractionRequestFailed { .. }
            | MtoError::ExtractionApiError { .. }
            | MtoError::EmptyExtractionReply => ErrorKind::Extraction,
            MtoError::StorageIo { .. } | MtoError::InvalidConfig(_) | MtoError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_tagged_validation() {
        let e = MtoError::NotAPdfUpload {
            filename: "drawing.txt".into(),
        };
        assert_eq!(e.kind(), ErrorKind::Validation);
        assert!(e.to_string().contains("drawing.txt"));
    }

    #[test]
    fn crop_box_error_carries_fractions() {
        let e = MtoError::InvalidCropBox {
            x0: 1.2,
            x1: 0.3,
            y0: 0.0,
            y1: 0.5,
        };
        assert_eq!(e.kind(), ErrorKind::Geometry);
        let msg = e.to_string();
        assert!(msg.contains("x0=1.2000"), "got: {msg}");
        assert!(msg.contains("x1=0.3000"), "got: {msg}");
    }

    #[test]
    fn api_error_display() {
        let e = MtoError::ExtractionApiError {
            status: 429,
            detail: "rate limited".into(),
        };
        assert_eq!(e.kind(), ErrorKind::Extraction);
        assert!(e.to_string().contains("429"));
    }

    #[test]
    fn document_errors_are_tagged_document() {
        let e = MtoError::EmptyPdf {
            path: PathBuf::from("/tmp/x.pdf"),
        };
        assert_eq!(e.kind(), ErrorKind::Document);
    }
}
