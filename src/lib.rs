//! # isomto
//!
//! Extract the material take-off (MTO) table from piping isometric drawing
//! PDFs as CSV, using a Vision Language Model as the transcription engine.
//!
//! ## Why this crate?
//!
//! Isometric sheets are vector soup: the MTO table is drawn, not tagged,
//! and classic text extraction scrambles its reading order beyond repair.
//! Instead this crate crops the table region out of a rasterised page 1 and
//! lets a VLM read it as a human would. The crop rule is authored once in
//! centimetres against a reference sheet and applied proportionally, so the
//! same constants work across A3, A2, and vendor plot sizes.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (PDF)
//!  │
//!  ├─ 1. Validate  advisory .pdf filename check, isolation token
//!  ├─ 2. Store     upload bytes → pdf/{token}.pdf (ephemeral)
//!  ├─ 3. Render    crop region of page 1 → png/{token}.png (pdfium, ephemeral)
//!  ├─ 4. Extract   PNG → base64 → one vision API call → raw CSV text
//!  └─ 5. Persist   result/{stem}-{token}.csv  (ephemerals removed, always)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use isomto::{process_upload, OpenAiVisionClient, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder()
//!         .data_dir("./data")
//!         .api_key(std::env::var("OPENAI_API_KEY")?)
//!         .build()?;
//!     config.storage.ensure()?;
//!
//!     let client = OpenAiVisionClient::from_config(&config)?;
//!     let bytes = std::fs::read("ISO-88-104.pdf")?;
//!     let done = process_upload("ISO-88-104.pdf", &bytes, &config, &client).await?;
//!     println!("CSV written to {}", done.result_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `isomto-server` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding only the library:
//! ```toml
//! isomto = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod artifacts;
pub mod config;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod process;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use artifacts::RequestArtifacts;
pub use config::{ServiceConfig, ServiceConfigBuilder, StorageDirs, MTO_CROP, REFERENCE_SHEET};
pub use error::{ErrorKind, MtoError};
pub use geometry::{CropSpec, NormalizedCropBox, PageGeometry, PixelCropRect, ReferenceFrame};
pub use pipeline::extract::{OpenAiVisionClient, VisionExtractor};
pub use process::{process_upload, CompletedExtraction};
pub use server::{router, AppState};
