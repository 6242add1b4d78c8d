//! Service configuration.
//!
//! Every knob lives in one immutable [`ServiceConfig`] built once at startup
//! and passed by reference into the pipeline — neither the calculator nor
//! the rasterizer reads ambient global state. Building the config also
//! computes and validates the [`NormalizedCropBox`], so a defective crop
//! constant kills the process before it can touch a single upload.
//!
//! # Design choice: builder over constructor
//! The builder lets the server binary set only what its flags cover and
//! rely on documented defaults for the rest, and lets tests swap in a
//! scratch storage root with one call.

use crate::error::MtoError;
use crate::geometry::{self, CropSpec, NormalizedCropBox, ReferenceFrame};
use std::path::{Path, PathBuf};

/// Canonical sheet layout the crop rule was measured against.
///
/// The production isometric template plots at 29.0 x 41.5 cm.
pub const REFERENCE_SHEET: ReferenceFrame = ReferenceFrame {
    width_cm: 29.0,
    height_cm: 41.5,
};

/// Crop boundaries of the MTO table on the reference sheet.
///
/// The table occupies the right third of the sheet (columns 9-12 of the
/// 12-column title grid) between 3.5% and 68% of the sheet height.
pub const MTO_CROP: CropSpec = CropSpec {
    left_cm: (8.0 / 12.0) * 29.0,
    right_cm: 29.0,
    top_cm: 0.035 * 41.5,
    bottom_cm: 0.68 * 41.5,
};

/// The three staging directories the service works out of.
///
/// `pdf` and `png` hold per-request ephemeral artifacts; `result` holds the
/// persisted CSV replies until externally cleaned.
#[derive(Debug, Clone)]
pub struct StorageDirs {
    pub pdf_dir: PathBuf,
    pub image_dir: PathBuf,
    pub result_dir: PathBuf,
}

impl StorageDirs {
    /// Lay the three directories out under a single data root.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            pdf_dir: root.join("pdf"),
            image_dir: root.join("png"),
            result_dir: root.join("result"),
        }
    }

    /// Create all three directories if absent. Called once at startup.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.pdf_dir)?;
        std::fs::create_dir_all(&self.image_dir)?;
        std::fs::create_dir_all(&self.result_dir)?;
        Ok(())
    }
}

/// Configuration for the extraction service.
///
/// Built via [`ServiceConfig::builder()`].
///
/// # Example
/// ```rust
/// use isomto::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .data_dir("./data")
///     .dpi(300)
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// assert!(config.crop_box.x1 <= 1.0 + isomto::geometry::TOLERANCE);
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Reference sheet layout the crop rule is authored against.
    pub reference: ReferenceFrame,

    /// Physical crop boundaries on the reference sheet.
    pub crop: CropSpec,

    /// The crop rule as page fractions. Derived and validated by
    /// [`ServiceConfigBuilder::build`]; never recomputed per request.
    pub crop_box: NormalizedCropBox,

    /// Rendering DPI for the cropped raster. Range: 72-600. Default: 300.
    ///
    /// Engineering drawings carry small-font part numbers; 300 DPI keeps
    /// them legible to the vision model while staying under typical API
    /// image-size limits for a third-of-a-sheet crop.
    pub dpi: u32,

    /// Staging directories. Default: `pdf/`, `png/`, `result/` under `./data`.
    pub storage: StorageDirs,

    /// Vision model identifier. Default: "gpt-4.1-mini".
    pub model: String,

    /// Base URL of the OpenAI-compatible endpoint,
    /// e.g. `https://api.openai.com/v1`.
    pub api_base: String,

    /// API credential, supplied out of band (flag or environment).
    pub api_key: String,

    /// Maximum tokens the model may spend on the CSV reply. Default: 1000.
    ///
    /// A full MTO table rarely exceeds 600 tokens; 1000 leaves headroom
    /// without letting a runaway reply bill for thousands.
    pub max_reply_tokens: usize,

    /// Per-call timeout for the vision request in seconds. Default: 60.
    ///
    /// The external service is the only blocking operation in a request;
    /// without a deadline a stalled upstream would pin the worker forever.
    pub api_timeout_secs: u64,
}

impl ServiceConfig {
    /// Create a new builder seeded with the production defaults.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    reference: ReferenceFrame,
    crop: CropSpec,
    dpi: u32,
    storage: StorageDirs,
    model: String,
    api_base: String,
    api_key: String,
    max_reply_tokens: usize,
    api_timeout_secs: u64,
}

impl Default for ServiceConfigBuilder {
    fn default() -> Self {
        Self {
            reference: REFERENCE_SHEET,
            crop: MTO_CROP,
            dpi: 300,
            storage: StorageDirs::under("./data"),
            model: "gpt-4.1-mini".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            max_reply_tokens: 1000,
            api_timeout_secs: 60,
        }
    }
}

impl ServiceConfigBuilder {
    pub fn reference(mut self, frame: ReferenceFrame) -> Self {
        self.reference = frame;
        self
    }

    pub fn crop(mut self, crop: CropSpec) -> Self {
        self.crop = crop;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi.clamp(72, 600);
        self
    }

    /// Place all three staging directories under `root`.
    pub fn data_dir(mut self, root: impl AsRef<Path>) -> Self {
        self.storage = StorageDirs::under(root);
        self
    }

    pub fn storage(mut self, storage: StorageDirs) -> Self {
        self.storage = storage;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    pub fn max_reply_tokens(mut self, n: usize) -> Self {
        self.max_reply_tokens = n.max(1);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.api_timeout_secs = secs.max(1);
        self
    }

    /// Build the configuration, normalizing and validating the crop rule.
    ///
    /// This is where a defective geometry constant surfaces — at process
    /// start, not on the first unlucky request.
    pub fn build(self) -> Result<ServiceConfig, MtoError> {
        let crop_box = geometry::normalize(&self.reference, &self.crop)?;

        if self.api_base.is_empty() {
            return Err(MtoError::InvalidConfig("api_base must not be empty".into()));
        }

        Ok(ServiceConfig {
            reference: self.reference,
            crop: self.crop,
            crop_box,
            dpi: self.dpi,
            storage: self.storage,
            model: self.model,
            api_base: self.api_base,
            api_key: self.api_key,
            max_reply_tokens: self.max_reply_tokens,
            api_timeout_secs: self.api_timeout_secs,
        })
    }
}
