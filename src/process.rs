//! Request orchestration: one upload in, one persisted CSV out.
//!
//! A request moves through `RECEIVED → STORED → RASTERIZED → EXTRACTED →
//! PERSISTED`, and any step can fail straight to `FAILED`. Whichever way
//! the request ends, its ephemeral artifacts are removed: the
//! [`RequestArtifacts`] set is acquired right after validation and its
//! `Drop` runs on every exit path out of [`process_upload`] — including a
//! mid-flight abort that drops the future.
//!
//! Requests share nothing: no locks, no caches, no cross-request state.
//! Isolation is purely the token namespacing every path.

use crate::artifacts::RequestArtifacts;
use crate::config::ServiceConfig;
use crate::error::MtoError;
use crate::pipeline::{extract::VisionExtractor, render};
use crate::prompts::EXTRACTION_PROMPT;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

/// Outcome of one successfully processed upload.
#[derive(Debug)]
pub struct CompletedExtraction {
    /// The request's isolation token; also the client-facing download name.
    pub token: Uuid,
    /// Where the CSV reply was persisted.
    pub result_path: PathBuf,
    pub duration_ms: u64,
}

/// Process one uploaded drawing end to end.
///
/// Rejects non-PDF filenames before creating any file. On success the CSV
/// reply has been written to the returned result path; on failure the
/// innermost error propagates. Either way the ephemeral PDF and crop image
/// are gone by the time this returns.
pub async fn process_upload(
    filename: &str,
    bytes: &[u8],
    config: &ServiceConfig,
    extractor: &dyn VisionExtractor,
) -> Result<CompletedExtraction, MtoError> {
    let start = Instant::now();

    // RECEIVED → STORED: validate before any resource is touched.
    let stem = upload_stem(filename)?;
    let artifacts = RequestArtifacts::allocate(&config.storage, &stem);
    info!(token = %artifacts.token(), upload = filename, "Processing upload");

    tokio::fs::write(artifacts.pdf_path(), bytes)
        .await
        .map_err(|e| MtoError::StorageIo {
            path: artifacts.pdf_path().to_path_buf(),
            source: e,
        })?;

    // STORED → RASTERIZED
    render::rasterize_first_page(
        artifacts.pdf_path(),
        artifacts.image_path(),
        config.crop_box,
        config.dpi,
    )
    .await?;

    // RASTERIZED → EXTRACTED
    let csv = extractor
        .extract(artifacts.image_path(), EXTRACTION_PROMPT)
        .await?;

    // EXTRACTED → PERSISTED: the reply is written verbatim.
    tokio::fs::write(artifacts.result_path(), csv.as_bytes())
        .await
        .map_err(|e| MtoError::StorageIo {
            path: artifacts.result_path().to_path_buf(),
            source: e,
        })?;

    let completed = CompletedExtraction {
        token: artifacts.token(),
        result_path: artifacts.result_path().to_path_buf(),
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        token = %completed.token,
        duration_ms = completed.duration_ms,
        "Extraction complete → {}",
        completed.result_path.display()
    );

    Ok(completed)
    // `artifacts` drops here — and on every `?` above — removing the
    // ephemeral PDF and crop image.
}

/// Validate the claimed filename and derive the result-file stem.
///
/// The name is client-controlled, so only its final component counts:
/// `"../../etc/x.pdf"` yields the stem `"x"` and cannot escape the result
/// directory.
fn upload_stem(filename: &str) -> Result<String, MtoError> {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    if !name.to_ascii_lowercase().ends_with(".pdf") {
        return Err(MtoError::NotAPdfUpload {
            filename: filename.to_string(),
        });
    }

    let stem = name[..name.len() - 4].trim();
    if stem.is_empty() {
        return Err(MtoError::UnusableFilename {
            filename: filename.to_string(),
        });
    }

    Ok(stem.to_string())
}
