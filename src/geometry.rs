//! Crop geometry: from a fixed physical crop rule to per-page pixel rects.
//!
//! The MTO table sits in the same place on every isometric sheet *relative
//! to the sheet*, but incoming PDFs are produced at wildly different page
//! sizes (A3, A2, vendor-specific plots). The crop rule is therefore
//! authored once in centimetres against a canonical reference layout and
//! converted to page-proportional fractions at startup. Per request those
//! fractions are multiplied against the actual first-page dimensions — the
//! invariant is that the *fraction* of the page extracted is constant, not
//! the absolute measurement.
//!
//! ```text
//! ReferenceFrame + CropSpec ──normalize()──▶ NormalizedCropBox   (startup)
//! NormalizedCropBox × PageGeometry ──▶ CropRect ──clamp──▶ PixelCropRect   (per request)
//! ```

use crate::error::MtoError;

/// Numeric slack applied when validating normalized fractions.
///
/// Crop boundaries are authored as products of hand-measured centimetres;
/// a boundary that lands on the page edge may compute to 1.0000001.
pub const TOLERANCE: f64 = 1e-5;

/// Physical width/height of the canonical sheet layout the crop rule was
/// measured against, in centimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceFrame {
    pub width_cm: f64,
    pub height_cm: f64,
}

/// Crop boundaries in centimetres, expressed against a [`ReferenceFrame`].
///
/// `left < right` and `top < bottom`; the y axis grows downwards, matching
/// PDF raster space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropSpec {
    pub left_cm: f64,
    pub right_cm: f64,
    pub top_cm: f64,
    pub bottom_cm: f64,
}

/// A crop region as page-size-independent fractions in `[0, 1]`.
///
/// Only [`normalize`] constructs a validated value; a box that fails
/// validation never reaches a real document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedCropBox {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

/// Convert a physical crop rule into a [`NormalizedCropBox`].
///
/// Fails with a geometry error if the reference dimensions are not strictly
/// positive (checked before any division) or if the resulting fractions are
/// out of order or outside `[-TOLERANCE, 1 + TOLERANCE]`.
pub fn normalize(reference: &ReferenceFrame, crop: &CropSpec) -> Result<NormalizedCropBox, MtoError> {
    if reference.width_cm <= 0.0 || reference.height_cm <= 0.0 {
        return Err(MtoError::NonPositiveReference {
            width: reference.width_cm,
            height: reference.height_cm,
        });
    }

    let boxed = NormalizedCropBox {
        x0: crop.left_cm / reference.width_cm,
        x1: crop.right_cm / reference.width_cm,
        y0: crop.top_cm / reference.height_cm,
        y1: crop.bottom_cm / reference.height_cm,
    };

    let in_unit = |v: f64| v >= -TOLERANCE && v <= 1.0 + TOLERANCE;
    let ordered = boxed.x0 < boxed.x1 && boxed.y0 < boxed.y1;
    if !ordered || ![boxed.x0, boxed.x1, boxed.y0, boxed.y1].iter().all(|&v| in_unit(v)) {
        return Err(MtoError::InvalidCropBox {
            x0: boxed.x0,
            x1: boxed.x1,
            y0: boxed.y0,
            y1: boxed.y1,
        });
    }

    Ok(boxed)
}

/// Actual first-page dimensions of one document, in the PDF's own units
/// (points). Read fresh per request when the document is opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
}

impl NormalizedCropBox {
    /// Scale this box by a page's actual dimensions, yielding the candidate
    /// crop rect in page units.
    pub fn scale_to(&self, page: &PageGeometry) -> CropRect {
        CropRect {
            x0: self.x0 * page.width,
            y0: self.y0 * page.height,
            x1: self.x1 * page.width,
            y1: self.y1 * page.height,
        }
    }
}

/// A candidate crop rect in page units, before it is clamped to the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl CropRect {
    /// Whether all four bounds are finite and the rect has positive area.
    pub fn is_well_formed(&self) -> bool {
        [self.x0, self.y0, self.x1, self.y1].iter().all(|v| v.is_finite())
            && self.x0 < self.x1
            && self.y0 < self.y1
    }

    /// Intersect with the page's own rectangle `(0, 0, width, height)`.
    ///
    /// The intersection never expands the rect; a rect fully outside the
    /// page collapses to an empty one.
    pub fn intersect_page(&self, page: &PageGeometry) -> CropRect {
        CropRect {
            x0: self.x0.max(0.0),
            y0: self.y0.max(0.0),
            x1: self.x1.min(page.width),
            y1: self.y1.min(page.height),
        }
    }

    /// Whether the rect encloses no area.
    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    /// Project this page-unit rect onto a rendered bitmap of
    /// `img_width x img_height` pixels, clamped to the bitmap bounds.
    ///
    /// Rounding drift at the page edge must not push the rect past the
    /// bitmap, so the result is clamped once more in pixel space.
    pub fn to_pixels(&self, page: &PageGeometry, img_width: u32, img_height: u32) -> PixelCropRect {
        let sx = img_width as f64 / page.width;
        let sy = img_height as f64 / page.height;

        let x = ((self.x0 * sx).floor().max(0.0) as u32).min(img_width);
        let y = ((self.y0 * sy).floor().max(0.0) as u32).min(img_height);
        let x1 = ((self.x1 * sx).ceil().max(0.0) as u32).min(img_width);
        let y1 = ((self.y1 * sy).ceil().max(0.0) as u32).min(img_height);

        PixelCropRect {
            x,
            y,
            width: x1.saturating_sub(x),
            height: y1.saturating_sub(y),
        }
    }
}

/// The final crop window in bitmap pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelCropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelCropRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
