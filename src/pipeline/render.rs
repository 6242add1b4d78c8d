//! First-page rasterisation: crop the MTO region out of a PDF via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves the work onto the blocking
//! thread pool so the axum workers keep serving requests during CPU-heavy
//! rendering.
//!
//! ## Why render full-page, then crop?
//!
//! pdfium renders whole pages; it has no clip-at-render API. The page is
//! rendered once at the target DPI and the crop window is cut out of the
//! bitmap with the `image` crate. The crop math happens in page units first
//! (candidate rect, page clamp) and is only projected into pixel space
//! at the very end, so the validation sequence is independent of DPI.
//!
//! The pdfium document handle lives only inside the blocking closure and is
//! dropped on every exit path, error or not.

use crate::error::MtoError;
use crate::geometry::{NormalizedCropBox, PageGeometry};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Rasterise the crop region of page 1 of `pdf_path` to a PNG at
/// `output_path`, overwriting any previous file there.
///
/// The output's parent directory is created if absent. Returns the output
/// path on success.
pub async fn rasterize_first_page(
    pdf_path: &Path,
    output_path: &Path,
    crop_box: NormalizedCropBox,
    dpi: u32,
) -> Result<PathBuf, MtoError> {
    let pdf = pdf_path.to_path_buf();
    let out = output_path.to_path_buf();

    tokio::task::spawn_blocking(move || rasterize_blocking(&pdf, &out, crop_box, dpi))
        .await
        .map_err(|e| MtoError::Internal(format!("Render task panicked: {e}")))?
}

fn rasterize_blocking(
    pdf_path: &Path,
    output_path: &Path,
    crop_box: NormalizedCropBox,
    dpi: u32,
) -> Result<PathBuf, MtoError> {
    use pdfium_render::prelude::*;

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| MtoError::StorageIo {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let pdfium = Pdfium::default();

    let document =
        pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| MtoError::UnreadablePdf {
                path: pdf_path.to_path_buf(),
                detail: format!("{e:?}"),
            })?;

    let pages = document.pages();
    if pages.len() == 0 {
        return Err(MtoError::EmptyPdf {
            path: pdf_path.to_path_buf(),
        });
    }

    // Single-page scope: only the first sheet carries the MTO table.
    let page = pages.get(0).map_err(|e| MtoError::RasterisationFailed {
        path: pdf_path.to_path_buf(),
        detail: format!("{e:?}"),
    })?;

    let geometry = PageGeometry {
        width: f64::from(page.width().value),
        height: f64::from(page.height().value),
    };
    debug!(
        "Page 1 is {:.1} x {:.1} pt ({})",
        geometry.width,
        geometry.height,
        pdf_path.display()
    );

    let candidate = crop_box.scale_to(&geometry);
    if !candidate.is_well_formed() {
        return Err(MtoError::InvalidCrop {
            page_width: geometry.width,
            page_height: geometry.height,
            detail: format!("degenerate candidate rect {candidate:?}"),
        });
    }

    let clipped = candidate.intersect_page(&geometry);
    if clipped.is_empty() {
        return Err(MtoError::CropOutsidePage {
            page_width: geometry.width,
            page_height: geometry.height,
        });
    }

    let render_config = PdfRenderConfig::new().set_target_width(target_pixel_width(
        geometry.width,
        dpi,
    ));

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| MtoError::RasterisationFailed {
            path: pdf_path.to_path_buf(),
            detail: format!("{e:?}"),
        })?;

    let full_page = bitmap.as_image();
    let px = clipped.to_pixels(&geometry, full_page.width(), full_page.height());
    if px.is_empty() {
        return Err(MtoError::InvalidCrop {
            page_width: geometry.width,
            page_height: geometry.height,
            detail: "crop collapses to zero pixels at this resolution".into(),
        });
    }

    let cropped = full_page.crop_imm(px.x, px.y, px.width, px.height);
    cropped
        .save(output_path)
        .map_err(|e| MtoError::RasterisationFailed {
            path: output_path.to_path_buf(),
            detail: format!("PNG write failed: {e}"),
        })?;

    info!(
        "Cropped page 1 → {}x{} px at {} DPI ({})",
        px.width,
        px.height,
        dpi,
        output_path.display()
    );

    Ok(output_path.to_path_buf())
}

/// Width in pixels of a full-page render at `dpi` (PDF points are 1/72").
fn target_pixel_width(page_width_pts: f64, dpi: u32) -> i32 {
    ((page_width_pts / 72.0) * f64::from(dpi)).round().max(1.0) as i32
}
