//! Image encoding: crop PNG on disk → base64 data URI.
//!
//! Vision APIs accept images as base64 data URIs embedded in the JSON
//! request body. The crop is already PNG on disk (lossless matters — JPEG
//! artefacts on rendered table text degrade transcription accuracy), so
//! encoding is a read plus base64. The format check happens here, before
//! any network call, so a missing or mangled crop never costs an API
//! round-trip.

use crate::error::MtoError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use tracing::debug;

/// PNG signature per the PNG specification.
const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// Read the crop image at `path` and encode it as a `data:image/png` URI.
///
/// Fails before touching the network if the file is missing or its bytes
/// do not start with the PNG signature.
pub fn encode_png_data_uri(path: &Path) -> Result<String, MtoError> {
    let bytes = std::fs::read(path).map_err(|_| MtoError::BadCropImage {
        path: path.to_path_buf(),
    })?;

    if bytes.len() < PNG_MAGIC.len() || bytes[..PNG_MAGIC.len()] != PNG_MAGIC {
        return Err(MtoError::BadCropImage {
            path: path.to_path_buf(),
        });
    }

    let b64 = STANDARD.encode(&bytes);
    debug!("Encoded crop image → {} bytes base64", b64.len());

    Ok(format!("data:image/png;base64,{b64}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn missing_file_fails_as_bad_crop_image() {
        let err = encode_png_data_uri(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, MtoError::BadCropImage { .. }));
    }

    #[test]
    fn non_png_bytes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crop.png");
        std::fs::write(&path, b"%PDF-1.4 definitely not a png").unwrap();
        let err = encode_png_data_uri(&path).unwrap_err();
        assert!(matches!(err, MtoError::BadCropImage { .. }));
    }

    #[test]
    fn real_png_round_trips_through_the_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crop.png");
        RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let uri = encode_png_data_uri(&path).unwrap();
        let b64 = uri.strip_prefix("data:image/png;base64,").expect("data URI prefix");
        let decoded = STANDARD.decode(b64).expect("valid base64");
        assert_eq!(decoded[..8], PNG_MAGIC);
    }
}
