//! Procedural photo collage compositing.
//!
//! Builds a single RGBA collage from already-decoded source rasters: the
//! first source is centered inside a shaped mask and randomly cut, masked
//! and rotated fragments of every source are scattered around it.
//! Decoding and encoding files is left to the caller.

pub mod compose;
pub mod config;
pub mod engine;
pub mod geometry;
pub mod layout;
pub mod mask;
pub mod raster;
pub mod resize;
pub mod rotate;

// Re-exports for convenience
pub use compose::{Placement, alpha_blend, random_position, random_position_avoid_main};
pub use config::{CollageConfig, CropMode};
pub use engine::{CollageEngine, CollageReport, generate};
pub use geometry::Rect;
pub use layout::{LayoutManager, MainArea, PolygonConfig};
pub use mask::{MaskGenerator, MaskShape, ShapeKind};
pub use raster::{apply_alpha_mask, normalize_raw, normalize_to_rgba};
pub use resize::{random_crop, resize_crop_center, scale_to_cover_and_random_crop};
pub use rotate::{rotate_arbitrary, rotate_random};

/// Errors that can occur while building a collage.
#[derive(Debug, thiserror::Error)]
pub enum CollageError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid canvas dimensions: {width}x{height}")]
    InvalidDimension { width: i64, height: i64 },

    #[error("Unsupported channel layout: {channels} channels (expected 1, 3 or 4)")]
    UnsupportedChannelLayout { channels: u8 },

    #[error("Source image {index} is degenerate ({width}x{height})")]
    DegenerateSourceImage { index: usize, width: u32, height: u32 },

    #[error("Invalid raster: {0}")]
    InvalidRaster(String),
}

/// Result type alias for collage operations.
pub type Result<T> = std::result::Result<T, CollageError>;
