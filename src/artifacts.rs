//! Per-request artifact paths and their guaranteed cleanup.
//!
//! Every request owns a [`RequestArtifacts`] value for its whole lifetime.
//! The isolation token namespaces all three paths, so two concurrent
//! requests never collide on disk even when uploaded under the same
//! original filename. Cleanup of the ephemeral members lives in `Drop`:
//! it runs on normal return, on `?` propagation, on panic unwind, and when
//! the request future is dropped because the client went away.

use crate::config::StorageDirs;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// The file paths owned by one request, keyed by its isolation token.
///
/// The PDF and image paths are ephemeral and removed when this value is
/// dropped; the result path persists until externally cleaned.
#[derive(Debug)]
pub struct RequestArtifacts {
    token: Uuid,
    pdf_path: PathBuf,
    image_path: PathBuf,
    result_path: PathBuf,
}

impl RequestArtifacts {
    /// Allocate a fresh artifact set under the configured staging dirs.
    ///
    /// The result file is token-qualified so same-named uploads never
    /// overwrite each other's output.
    pub fn allocate(storage: &StorageDirs, upload_stem: &str) -> Self {
        let token = Uuid::new_v4();
        Self {
            pdf_path: storage.pdf_dir.join(format!("{token}.pdf")),
            image_path: storage.image_dir.join(format!("{token}.png")),
            result_path: storage.result_dir.join(format!("{upload_stem}-{token}.csv")),
            token,
        }
    }

    pub fn token(&self) -> Uuid {
        self.token
    }

    /// Ephemeral path the upload bytes are stored at.
    pub fn pdf_path(&self) -> &Path {
        &self.pdf_path
    }

    /// Ephemeral path the cropped raster is written to.
    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    /// Persistent path the CSV reply is written to.
    pub fn result_path(&self) -> &Path {
        &self.result_path
    }
}

impl Drop for RequestArtifacts {
    fn drop(&mut self) {
        for path in [&self.pdf_path, &self.image_path] {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    token = %self.token,
                    path = %path.display(),
                    "Failed to remove ephemeral artifact: {e}"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_storage() -> (tempfile::TempDir, StorageDirs) {
        let root = tempfile::tempdir().expect("tempdir");
        let dirs = StorageDirs::under(root.path());
        dirs.ensure().expect("create staging dirs");
        (root, dirs)
    }

    #[test]
    fn drop_removes_ephemeral_files_and_keeps_result() {
        let (_root, dirs) = scratch_storage();

        let (pdf, image, result) = {
            let artifacts = RequestArtifacts::allocate(&dirs, "drawing");
            std::fs::write(artifacts.pdf_path(), b"%PDF-1.4").unwrap();
            std::fs::write(artifacts.image_path(), b"png bytes").unwrap();
            std::fs::write(artifacts.result_path(), b"csv").unwrap();
            (
                artifacts.pdf_path().to_path_buf(),
                artifacts.image_path().to_path_buf(),
                artifacts.result_path().to_path_buf(),
            )
        };

        assert!(!pdf.exists(), "ephemeral PDF must be removed on drop");
        assert!(!image.exists(), "ephemeral image must be removed on drop");
        assert!(result.exists(), "result must persist past the request");
    }

    #[test]
    fn drop_is_quiet_when_nothing_was_written() {
        let (_root, dirs) = scratch_storage();
        // Early-rejected requests drop the set before any file exists.
        let artifacts = RequestArtifacts::allocate(&dirs, "drawing");
        drop(artifacts);
    }

    #[test]
    fn same_named_uploads_get_disjoint_paths() {
        let (_root, dirs) = scratch_storage();
        let a = RequestArtifacts::allocate(&dirs, "drawing");
        let b = RequestArtifacts::allocate(&dirs, "drawing");
        assert_ne!(a.token(), b.token());
        assert_ne!(a.pdf_path(), b.pdf_path());
        assert_ne!(a.image_path(), b.image_path());
        assert_ne!(a.result_path(), b.result_path());
    }
}
