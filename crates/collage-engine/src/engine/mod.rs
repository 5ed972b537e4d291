//! End-to-end collage generation.
//!
//! A run walks a fixed sequence of stages: allocate the working canvas
//! (output plus margin), place the scattered pieces, place the main image on
//! top, crop the margin away. Pieces are prepared in parallel batches with
//! one random stream per piece; each batch is blended on the calling thread
//! in piece order before the next is prepared, so a seed always reproduces
//! the same output and only one batch of patches is alive at a time.

use std::time::Instant;

use image::{DynamicImage, Rgba, RgbaImage, imageops};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::compose::{Placement, alpha_blend, random_position_avoid_main};
use crate::config::{CollageConfig, CropMode};
use crate::layout::{LayoutManager, MainArea};
use crate::mask::MaskGenerator;
use crate::raster::{apply_alpha_mask, normalize_to_rgba};
use crate::resize::{random_crop, resize_crop_center, scale_to_cover_and_random_crop};
use crate::rotate::rotate_random;
use crate::{CollageError, Result};


/// Summary of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollageReport {
    /// Seed that reproduces this run.
    pub seed: u64,
    pub pieces_placed: usize,
    /// Pieces whose placement search found no low-overlap position.
    pub fallback_placements: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    CanvasAllocated,
    PiecesPlaced,
    MainPlaced,
    Cropped,
    Done,
}

impl Stage {
    fn advance(&mut self) {
        let next = match self {
            Stage::Idle => Stage::CanvasAllocated,
            Stage::CanvasAllocated => Stage::PiecesPlaced,
            Stage::PiecesPlaced => Stage::MainPlaced,
            Stage::MainPlaced => Stage::Cropped,
            Stage::Cropped | Stage::Done => Stage::Done,
        };
        let from = *self;
        debug!(from = ?from, to = ?next, "Collage stage");
        *self = next;
    }
}

/// One scattered piece before blending.
struct PieceJob {
    source: usize,
    seed: u64,
}

struct PreparedPiece {
    patch: RgbaImage,
    placement: Placement,
}

/// Pieces prepared per worker thread before a batch is blended.
const PIECES_PER_THREAD: usize = 4;

/// Builds collages with a fixed configuration.
#[derive(Debug, Clone)]
pub struct CollageEngine {
    config: CollageConfig,
    masker: MaskGenerator,
}

impl Default for CollageEngine {
    fn default() -> Self {
        Self::new(CollageConfig::default())
    }
}

impl CollageEngine {
    pub fn new(config: CollageConfig) -> Self {
        let masker = MaskGenerator::new(config.polygon_probability, config.smooth_piece_edges);
        Self { config, masker }
    }

    pub fn config(&self) -> &CollageConfig {
        &self.config
    }

    /// Build an `output_width x output_height` collage. The first source is
    /// the main image.
    pub fn generate(
        &self,
        sources: &[RgbaImage],
        output_width: u32,
        output_height: u32,
        piece_count: usize,
        seed: Option<u64>,
    ) -> Result<RgbaImage> {
        self.generate_with_report(sources, output_width, output_height, piece_count, seed)
            .map(|(img, _)| img)
    }

    /// Like [`generate`](Self::generate) for decoded rasters of any
    /// supported channel layout.
    pub fn generate_from_dynamic(
        &self,
        sources: &[DynamicImage],
        output_width: u32,
        output_height: u32,
        piece_count: usize,
        seed: Option<u64>,
    ) -> Result<RgbaImage> {
        let sources = sources
            .iter()
            .map(normalize_to_rgba)
            .collect::<Result<Vec<_>>>()?;
        self.generate(&sources, output_width, output_height, piece_count, seed)
    }

    /// Build a collage and report how the run went.
    pub fn generate_with_report(
        &self,
        sources: &[RgbaImage],
        output_width: u32,
        output_height: u32,
        piece_count: usize,
        seed: Option<u64>,
    ) -> Result<(RgbaImage, CollageReport)> {
        let started = Instant::now();
        self.validate_inputs(sources, output_width, output_height)?;

        let seed = seed.unwrap_or_else(|| StdRng::from_entropy().r#gen());
        let mut rng = StdRng::seed_from_u64(seed);
        let mut stage = Stage::Idle;

        info!(
            output_width,
            output_height,
            piece_count,
            sources = sources.len(),
            seed,
            "Generating collage"
        );

        // Canvas with margin, layout against the working size
        let margin = self.config.margin;
        let work_w = padded(output_width, margin)?;
        let work_h = padded(output_height, margin)?;
        let layout = LayoutManager::new(i64::from(work_w), i64::from(work_h), &self.config)?;
        let (canvas_w, canvas_h) = layout.canvas_size();
        let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, Rgba(self.config.background));
        stage.advance();

        // Scattered pieces
        let jobs: Vec<PieceJob> = (0..piece_count)
            .map(|_| PieceJob {
                source: rng.gen_range(0..sources.len()),
                seed: rng.r#gen(),
            })
            .collect();

        let output_size = (output_width, output_height);
        let batch_size = piece_batch_size();
        let mut pieces_placed = 0;
        let mut fallback_placements = 0;
        for batch in jobs.chunks(batch_size) {
            let prepared: Vec<PreparedPiece> = batch
                .par_iter()
                .map(|job| self.prepare_piece(&sources[job.source], job.seed, &layout, output_size))
                .collect();

            for piece in &prepared {
                if piece.placement.fallback {
                    fallback_placements += 1;
                    warn!(
                        piece = pieces_placed,
                        x = piece.placement.x,
                        y = piece.placement.y,
                        "Placement search exhausted, piece may overlap the main area"
                    );
                }
                alpha_blend(&mut canvas, &piece.patch, piece.placement.x, piece.placement.y);
                pieces_placed += 1;
            }
        }
        debug!(pieces_placed, batch_size, "Pieces blended");
        stage.advance();

        // Main image last so nothing covers it
        self.place_main(&mut canvas, &sources[0], layout.main_area(), &mut rng);
        stage.advance();

        let output =
            imageops::crop_imm(&canvas, margin, margin, output_width, output_height).to_image();
        stage.advance();

        let report = CollageReport {
            seed,
            pieces_placed,
            fallback_placements,
        };
        stage.advance();

        info!(
            seed,
            pieces = report.pieces_placed,
            fallbacks = report.fallback_placements,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Collage complete"
        );

        Ok((output, report))
    }

    fn validate_inputs(&self, sources: &[RgbaImage], width: u32, height: u32) -> Result<()> {
        if sources.is_empty() {
            return Err(CollageError::InvalidInput(
                "at least one source image is required".into(),
            ));
        }
        if width == 0 || height == 0 {
            return Err(CollageError::InvalidInput(format!(
                "output size must be positive, got {width}x{height}"
            )));
        }
        self.config.validate()?;

        for (index, src) in sources.iter().enumerate() {
            let (w, h) = src.dimensions();
            if w == 0 || h == 0 {
                return Err(CollageError::DegenerateSourceImage {
                    index,
                    width: w,
                    height: h,
                });
            }
        }
        Ok(())
    }

    /// Crop, mask, rotate and position one piece on its own random stream.
    fn prepare_piece(
        &self,
        source: &RgbaImage,
        seed: u64,
        layout: &LayoutManager,
        output_size: (u32, u32),
    ) -> PreparedPiece {
        let mut rng = StdRng::seed_from_u64(seed);

        let (out_w, out_h) = output_size;
        let ((min_w, max_w), (min_h, max_h)) = layout.piece_size_range(out_w, out_h);
        let pw = rng.gen_range(min_w..=max_w);
        let ph = rng.gen_range(min_h..=max_h);

        let mut patch = random_crop(source, pw, ph, &mut rng);
        let mask = self.masker.create_piece_mask(
            patch.width(),
            patch.height(),
            &layout.polygon_config(),
            &mut rng,
        );
        apply_alpha_mask(&mut patch, &mask);
        let patch = rotate_random(&patch, &mut rng);

        let placement = random_position_avoid_main(
            layout.canvas_size(),
            patch.dimensions(),
            &layout.main_area().rect,
            &mut rng,
            self.config.max_placement_attempts,
            self.config.overlap_threshold,
        );

        PreparedPiece { patch, placement }
    }

    /// Fit the main image to the main area, mask it and blend it centered
    /// on the area.
    fn place_main(
        &self,
        canvas: &mut RgbaImage,
        source: &RgbaImage,
        area: MainArea,
        rng: &mut StdRng,
    ) {
        let (w, h) = (area.rect.width, area.rect.height);
        let mut main = match self.config.main_crop {
            CropMode::Random => {
                scale_to_cover_and_random_crop(source, w, h, self.config.overscan, rng)
            }
            CropMode::Center => resize_crop_center(source, w, h),
        };

        let mask = self.masker.create_area_mask(area.shape, w, h, rng);
        apply_alpha_mask(&mut main, &mask);

        if self.config.rotate_main {
            main = rotate_random(&main, rng);
        }

        let (cx, cy) = area.center();
        let x = cx - i64::from(main.width() / 2);
        let y = cy - i64::from(main.height() / 2);
        debug!(x, y, w = main.width(), h = main.height(), "Placing main image");

        alpha_blend(canvas, &main, x, y);
    }
}

/// Build a collage with the default configuration.
pub fn generate(
    sources: &[RgbaImage],
    output_width: u32,
    output_height: u32,
    piece_count: usize,
    seed: Option<u64>,
) -> Result<RgbaImage> {
    CollageEngine::default().generate(sources, output_width, output_height, piece_count, seed)
}

/// Jobs prepared together before blending; bounds the patches held at once.
fn piece_batch_size() -> usize {
    (rayon::current_num_threads() * PIECES_PER_THREAD).max(1)
}

/// `size + 2 * margin`, rejecting sizes that overflow.
fn padded(size: u32, margin: u32) -> Result<u32> {
    margin
        .checked_mul(2)
        .and_then(|m| size.checked_add(m))
        .ok_or_else(|| {
            CollageError::InvalidInput(format!("canvas {size} with margin {margin} is too large"))
        })
}
