//! Collage generation settings.
//!
//! One canonical profile of layout ratios, mask parameters and placement
//! limits. Values can be changed through the builder methods, loaded from
//! JSON through serde, or overridden from `COLLAGE_*` environment variables.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::compose::{DEFAULT_MAX_ATTEMPTS, DEFAULT_OVERLAP_THRESHOLD};
use crate::layout::PolygonConfig;
use crate::mask::ShapeKind;
use crate::{CollageError, Result};

/// How the main image is cropped after scale-to-cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropMode {
    /// Random offset inside the overscanned image.
    Random,
    /// Centered crop without overscan.
    Center,
}

/// Configuration for a collage run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollageConfig {
    /// Extra pixels on each side of the working canvas.
    pub margin: u32,

    /// Canvas fill before any piece is placed.
    pub background: [u8; 4],

    /// Main area size as a fraction of the working canvas.
    pub main_width_ratio: f64,
    pub main_height_ratio: f64,

    pub main_shape: ShapeKind,
    pub main_crop: CropMode,

    /// Rotate the main image by a random angle before placing it.
    pub rotate_main: bool,

    /// Extra scale applied after scale-to-cover so the random crop has room.
    pub overscan: f64,

    /// Piece size bounds as a fraction of the output size.
    pub piece_min_ratio: f64,
    pub piece_max_ratio: f64,

    /// Chance that a piece gets a polygon mask instead of a rectangle.
    pub polygon_probability: f64,
    pub polygon: PolygonConfig,
    pub smooth_piece_edges: bool,

    pub max_placement_attempts: u32,
    /// Largest share of a piece that may cover the main area.
    pub overlap_threshold: f64,
}

impl Default for CollageConfig {
    fn default() -> Self {
        Self {
            margin: 100,
            background: [255, 255, 255, 255],
            main_width_ratio: 0.35,
            main_height_ratio: 0.35,
            main_shape: ShapeKind::Ellipse,
            main_crop: CropMode::Random,
            rotate_main: true,
            overscan: 1.2,
            piece_min_ratio: 0.3,
            piece_max_ratio: 0.8,
            polygon_probability: 0.8,
            polygon: PolygonConfig::default(),
            smooth_piece_edges: true,
            max_placement_attempts: DEFAULT_MAX_ATTEMPTS,
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
        }
    }
}

impl CollageConfig {
    /// Create a config with the default profile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with `COLLAGE_*` environment overrides applied.
    ///
    /// Unparsable values keep the default and log a warning.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key/value source.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("COLLAGE_MARGIN") {
            self.margin = parse_or("COLLAGE_MARGIN", &v, self.margin);
        }
        if let Some(v) = get("COLLAGE_MAIN_WIDTH_RATIO") {
            self.main_width_ratio =
                parse_or("COLLAGE_MAIN_WIDTH_RATIO", &v, self.main_width_ratio);
        }
        if let Some(v) = get("COLLAGE_MAIN_HEIGHT_RATIO") {
            self.main_height_ratio =
                parse_or("COLLAGE_MAIN_HEIGHT_RATIO", &v, self.main_height_ratio);
        }
        if let Some(v) = get("COLLAGE_MAIN_SHAPE") {
            self.main_shape = ShapeKind::from_name(&v);
        }
        if let Some(v) = get("COLLAGE_MAIN_CROP") {
            match v.trim().to_ascii_lowercase().as_str() {
                "random" => self.main_crop = CropMode::Random,
                "center" => self.main_crop = CropMode::Center,
                other => warn!(key = "COLLAGE_MAIN_CROP", value = other, "Ignoring invalid value"),
            }
        }
        if let Some(v) = get("COLLAGE_ROTATE_MAIN") {
            self.rotate_main = parse_or("COLLAGE_ROTATE_MAIN", &v, self.rotate_main);
        }
        if let Some(v) = get("COLLAGE_OVERSCAN") {
            self.overscan = parse_or("COLLAGE_OVERSCAN", &v, self.overscan);
        }
        if let Some(v) = get("COLLAGE_PIECE_MIN_RATIO") {
            self.piece_min_ratio =
                parse_or("COLLAGE_PIECE_MIN_RATIO", &v, self.piece_min_ratio);
        }
        if let Some(v) = get("COLLAGE_PIECE_MAX_RATIO") {
            self.piece_max_ratio =
                parse_or("COLLAGE_PIECE_MAX_RATIO", &v, self.piece_max_ratio);
        }
        if let Some(v) = get("COLLAGE_POLYGON_PROBABILITY") {
            self.polygon_probability =
                parse_or("COLLAGE_POLYGON_PROBABILITY", &v, self.polygon_probability);
        }
        if let Some(v) = get("COLLAGE_SMOOTH_EDGES") {
            self.smooth_piece_edges =
                parse_or("COLLAGE_SMOOTH_EDGES", &v, self.smooth_piece_edges);
        }
        if let Some(v) = get("COLLAGE_MAX_ATTEMPTS") {
            self.max_placement_attempts =
                parse_or("COLLAGE_MAX_ATTEMPTS", &v, self.max_placement_attempts);
        }
        if let Some(v) = get("COLLAGE_OVERLAP_THRESHOLD") {
            self.overlap_threshold =
                parse_or("COLLAGE_OVERLAP_THRESHOLD", &v, self.overlap_threshold);
        }
        self
    }

    /// Check every value is in range.
    pub fn validate(&self) -> Result<()> {
        check_ratio("main_width_ratio", self.main_width_ratio)?;
        check_ratio("main_height_ratio", self.main_height_ratio)?;
        check_ratio("piece_min_ratio", self.piece_min_ratio)?;
        check_ratio("piece_max_ratio", self.piece_max_ratio)?;
        if self.piece_min_ratio > self.piece_max_ratio {
            return Err(invalid("piece_min_ratio must not exceed piece_max_ratio"));
        }
        if !self.overscan.is_finite() || self.overscan < 1.0 {
            return Err(invalid("overscan must be at least 1.0"));
        }
        if !(0.0..=1.0).contains(&self.polygon_probability) {
            return Err(invalid("polygon_probability must be between 0.0 and 1.0"));
        }
        if !(0.0..=1.0).contains(&self.overlap_threshold) {
            return Err(invalid("overlap_threshold must be between 0.0 and 1.0"));
        }

        let p = &self.polygon;
        if p.min_vertices < 3 {
            return Err(invalid("polygon needs at least 3 vertices"));
        }
        if p.min_vertices > p.max_vertices {
            return Err(invalid("polygon min_vertices must not exceed max_vertices"));
        }
        check_ratio("polygon.radius_min_ratio", p.radius_min_ratio)?;
        check_ratio("polygon.radius_max_ratio", p.radius_max_ratio)?;
        if p.radius_min_ratio > p.radius_max_ratio {
            return Err(invalid("polygon radius_min_ratio must not exceed radius_max_ratio"));
        }
        if !(0.0..=1.0).contains(&p.noise_ratio) {
            return Err(invalid("polygon noise_ratio must be between 0.0 and 1.0"));
        }
        Ok(())
    }

    /// Builder: set the working canvas margin.
    pub fn with_margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    /// Builder: set the background fill.
    pub fn with_background(mut self, rgba: [u8; 4]) -> Self {
        self.background = rgba;
        self
    }

    /// Builder: set the main area ratios.
    pub fn with_main_ratios(mut self, width: f64, height: f64) -> Self {
        self.main_width_ratio = width;
        self.main_height_ratio = height;
        self
    }

    /// Builder: set the main area mask shape.
    pub fn with_main_shape(mut self, shape: ShapeKind) -> Self {
        self.main_shape = shape;
        self
    }

    /// Builder: set how the main image is cropped.
    pub fn with_main_crop(mut self, mode: CropMode) -> Self {
        self.main_crop = mode;
        self
    }

    /// Builder: set whether the main image is rotated.
    pub fn with_rotate_main(mut self, val: bool) -> Self {
        self.rotate_main = val;
        self
    }

    /// Builder: set the overscan factor.
    pub fn with_overscan(mut self, overscan: f64) -> Self {
        self.overscan = overscan;
        self
    }

    /// Builder: set piece size ratios.
    pub fn with_piece_ratios(mut self, min: f64, max: f64) -> Self {
        self.piece_min_ratio = min;
        self.piece_max_ratio = max;
        self
    }

    /// Builder: set the polygon mask probability.
    pub fn with_polygon_probability(mut self, p: f64) -> Self {
        self.polygon_probability = p;
        self
    }

    /// Builder: set polygon mask bounds.
    pub fn with_polygon(mut self, polygon: PolygonConfig) -> Self {
        self.polygon = polygon;
        self
    }

    /// Builder: set edge smoothing for polygon masks.
    pub fn with_smooth_piece_edges(mut self, val: bool) -> Self {
        self.smooth_piece_edges = val;
        self
    }

    /// Builder: set placement search limits.
    pub fn with_placement(mut self, max_attempts: u32, overlap_threshold: f64) -> Self {
        self.max_placement_attempts = max_attempts;
        self.overlap_threshold = overlap_threshold;
        self
    }
}

fn invalid(msg: &str) -> CollageError {
    CollageError::InvalidInput(msg.to_string())
}

fn check_ratio(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(CollageError::InvalidInput(format!(
            "{name} must be in (0.0, 1.0], got {value}"
        )))
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, value: &str, default: T) -> T {
    match value.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(key, value, "Ignoring invalid value");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = CollageConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.margin, 100);
        assert_eq!(config.main_shape, ShapeKind::Ellipse);
        assert!((config.overscan - 1.2).abs() < f64::EPSILON);
        assert_eq!(config.max_placement_attempts, 50);
    }

    #[test]
    fn test_builder_chain() {
        let config = CollageConfig::new()
            .with_margin(20)
            .with_background([0, 0, 0, 255])
            .with_main_ratios(0.4, 0.45)
            .with_main_shape(ShapeKind::Circle)
            .with_main_crop(CropMode::Center)
            .with_rotate_main(false)
            .with_overscan(1.4)
            .with_piece_ratios(0.1, 0.4)
            .with_polygon_probability(1.0)
            .with_smooth_piece_edges(false)
            .with_placement(10, 0.5);

        assert_eq!(config.margin, 20);
        assert_eq!(config.background, [0, 0, 0, 255]);
        assert_eq!(config.main_shape, ShapeKind::Circle);
        assert_eq!(config.main_crop, CropMode::Center);
        assert!(!config.rotate_main);
        assert!(!config.smooth_piece_edges);
        assert_eq!(config.max_placement_attempts, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let cases = [
            CollageConfig::new().with_main_ratios(0.0, 0.5),
            CollageConfig::new().with_main_ratios(0.5, 1.5),
            CollageConfig::new().with_piece_ratios(0.8, 0.3),
            CollageConfig::new().with_overscan(0.9),
            CollageConfig::new().with_polygon_probability(1.1),
            CollageConfig::new().with_placement(50, -0.1),
            CollageConfig::new().with_polygon(PolygonConfig {
                min_vertices: 2,
                ..PolygonConfig::default()
            }),
            CollageConfig::new().with_polygon(PolygonConfig {
                min_vertices: 9,
                max_vertices: 4,
                ..PolygonConfig::default()
            }),
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(CollageError::InvalidInput(_))),
                "{config:?}"
            );
        }
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = CollageConfig::default().with_overrides(lookup(&[
            ("COLLAGE_MARGIN", "40"),
            ("COLLAGE_MAIN_SHAPE", "circle"),
            ("COLLAGE_MAIN_CROP", "center"),
            ("COLLAGE_ROTATE_MAIN", "false"),
            ("COLLAGE_OVERSCAN", "1.4"),
            ("COLLAGE_MAX_ATTEMPTS", "7"),
        ]));
        assert_eq!(config.margin, 40);
        assert_eq!(config.main_shape, ShapeKind::Circle);
        assert_eq!(config.main_crop, CropMode::Center);
        assert!(!config.rotate_main);
        assert!((config.overscan - 1.4).abs() < f64::EPSILON);
        assert_eq!(config.max_placement_attempts, 7);
    }

    #[test]
    fn test_invalid_overrides_keep_defaults() {
        let config = CollageConfig::default().with_overrides(lookup(&[
            ("COLLAGE_MARGIN", "lots"),
            ("COLLAGE_OVERSCAN", ""),
            ("COLLAGE_MAIN_CROP", "sideways"),
        ]));
        assert_eq!(config, CollageConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let config = CollageConfig::default().with_main_shape(ShapeKind::Rectangle);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"main_shape\":\"rectangle\""));
        let parsed: CollageConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed: CollageConfig = serde_json::from_str(r#"{"margin": 12}"#).unwrap();
        assert_eq!(parsed.margin, 12);
        assert_eq!(parsed.main_crop, CropMode::Random);
    }
}
