use crate::detector::DetectError;

/// ISO/IEC 7810 ID-1 physical aspect ratio: 85.6mm x 53.98mm.
pub const ID1_ASPECT_RATIO: f32 = 1.586;

/// Working resolution cap: inputs are downscaled so the longer side
/// does not exceed this before any detection work happens.
pub const MAX_WORKING_SIDE: u32 = 1200;

/// Floor on the best-candidate score below which detection reports
/// no document. Rejects pure noise while staying permissive for
/// low-quality photos.
pub const MIN_DOCUMENT_SCORE: f32 = 0.1;

/// Parameter bundle driving one detection call.
///
/// Immutable value type: adaptive selection (`for_size`) or explicit
/// overrides produce a new bundle, nothing mutates one in place, so
/// concurrent detections never share tunable state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectParams {
    /// Lower Canny threshold (used when adaptive thresholding is off).
    pub edge_low: f32,
    /// Upper Canny threshold.
    pub edge_high: f32,
    /// Minimum candidate area as a fraction of image area.
    pub min_area_ratio: f32,
    /// Maximum candidate area as a fraction of image area.
    pub max_area_ratio: f32,
    /// Polygon approximation epsilon as a fraction of contour perimeter.
    pub approx_epsilon_factor: f64,
    /// Expected document aspect ratio (width / height).
    pub target_aspect_ratio: f32,
    /// Relative tolerance on the aspect ratio before the aspect score
    /// falls to zero.
    pub aspect_tolerance: f32,
}

impl Default for DetectParams {
    /// ID-1 tuned defaults for when no resolution is known: low edge
    /// thresholds for subtle card edges, a wide area admission window,
    /// and 40% aspect tolerance for perspective distortion.
    fn default() -> Self {
        Self {
            edge_low: 10.0,
            edge_high: 30.0,
            min_area_ratio: 0.002,
            max_area_ratio: 0.99,
            approx_epsilon_factor: 0.01,
            target_aspect_ratio: ID1_ASPECT_RATIO,
            aspect_tolerance: 0.4,
        }
    }
}

impl DetectParams {
    /// Select parameters for a working-resolution image, bucketed by the
    /// smaller dimension. Always returns a valid bundle.
    pub fn for_size(width: u32, height: u32) -> Self {
        let min_dim = width.min(height);
        let max_dim = width.max(height);

        let mut params = if min_dim < 400 {
            // Low resolution: older phones, webcams.
            Self {
                edge_low: 30.0,
                edge_high: 90.0,
                min_area_ratio: 0.05,
                max_area_ratio: 0.95,
                approx_epsilon_factor: 0.02,
                aspect_tolerance: 0.5,
                ..Self::default()
            }
        } else if min_dim < 800 {
            // Medium resolution: 1-2MP.
            Self {
                edge_low: 25.0,
                edge_high: 75.0,
                min_area_ratio: 0.01,
                max_area_ratio: 0.90,
                approx_epsilon_factor: 0.015,
                aspect_tolerance: 0.4,
                ..Self::default()
            }
        } else if min_dim < 1500 {
            // High resolution: most modern phones.
            Self {
                edge_low: 20.0,
                edge_high: 60.0,
                min_area_ratio: 0.005,
                max_area_ratio: 0.85,
                approx_epsilon_factor: 0.01,
                aspect_tolerance: 0.35,
                ..Self::default()
            }
        } else {
            // Very high resolution: 12MP+ flagship cameras.
            Self {
                edge_low: 15.0,
                edge_high: 45.0,
                min_area_ratio: 0.002,
                max_area_ratio: 0.80,
                approx_epsilon_factor: 0.008,
                aspect_tolerance: 0.3,
                ..Self::default()
            }
        };

        // Wide/panoramic framing: the document occupies a smaller
        // fraction of the frame, and foreshortening distorts aspect.
        if min_dim > 0 && max_dim as f32 / min_dim as f32 > 2.5 {
            params.min_area_ratio *= 0.5;
            params.aspect_tolerance *= 1.2;
        }

        params
    }

    pub fn with_edge_thresholds(self, low: f32, high: f32) -> Self {
        Self {
            edge_low: low,
            edge_high: high,
            ..self
        }
    }

    pub fn with_area_ratios(self, min: f32, max: f32) -> Self {
        Self {
            min_area_ratio: min,
            max_area_ratio: max,
            ..self
        }
    }

    pub fn with_aspect(self, target: f32, tolerance: f32) -> Self {
        Self {
            target_aspect_ratio: target,
            aspect_tolerance: tolerance,
            ..self
        }
    }

    pub fn with_epsilon_factor(self, factor: f64) -> Self {
        Self {
            approx_epsilon_factor: factor,
            ..self
        }
    }
}

/// Pixel layout of a raw caller-supplied buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb,
    Rgba,
    Bgr,
    Bgra,
    Grayscale,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb | PixelFormat::Bgr => 3,
            PixelFormat::Rgba | PixelFormat::Bgra => 4,
            PixelFormat::Grayscale => 1,
        }
    }
}

/// Explicit detector configuration.
///
/// Any field left `None` is filled per call by the adaptive selector;
/// a set field always wins over adaptive selection.
#[derive(Clone, Debug)]
pub struct DetectorConfig {
    pub edge_low: Option<f32>,
    pub edge_high: Option<f32>,
    pub min_area_ratio: Option<f32>,
    pub max_area_ratio: Option<f32>,
    pub approx_epsilon_factor: Option<f64>,
    pub aspect_tolerance: Option<f32>,
    /// Derive Canny thresholds from image mean/stddev instead of the
    /// selector values. Explicit edge_low/edge_high overrides disable this.
    pub adaptive_thresholds: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            edge_low: None,
            edge_high: None,
            min_area_ratio: None,
            max_area_ratio: None,
            approx_epsilon_factor: None,
            aspect_tolerance: None,
            adaptive_thresholds: true,
        }
    }
}

impl DetectorConfig {
    /// Resolve a per-call bundle: adaptive selection first, explicit
    /// overrides on top.
    pub fn resolve(&self, width: u32, height: u32) -> DetectParams {
        let mut params = DetectParams::for_size(width, height);
        if let Some(v) = self.edge_low {
            params.edge_low = v;
        }
        if let Some(v) = self.edge_high {
            params.edge_high = v;
        }
        if let Some(v) = self.min_area_ratio {
            params.min_area_ratio = v;
        }
        if let Some(v) = self.max_area_ratio {
            params.max_area_ratio = v;
        }
        if let Some(v) = self.approx_epsilon_factor {
            params.approx_epsilon_factor = v;
        }
        if let Some(v) = self.aspect_tolerance {
            params.aspect_tolerance = v;
        }
        params
    }

    /// Whether dynamic mean/stddev thresholding applies for this call.
    pub fn use_adaptive_thresholds(&self) -> bool {
        self.adaptive_thresholds && self.edge_low.is_none() && self.edge_high.is_none()
    }

    /// Apply a string key/value setting, the shape the embedding boundary
    /// layer exposes. Unknown keys and unparseable values are rejected.
    pub fn set_key(&mut self, key: &str, value: &str) -> Result<(), DetectError> {
        let bad = |v: &str| DetectError::Config(format!("invalid value for {key}: {v}"));

        match key {
            "edge_low" | "edge_high" | "min_area_ratio" | "max_area_ratio"
            | "aspect_tolerance" => {
                let v: f32 = value.parse().map_err(|_| bad(value))?;
                if !v.is_finite() || v <= 0.0 {
                    return Err(bad(value));
                }
                match key {
                    "edge_low" => self.edge_low = Some(v),
                    "edge_high" => self.edge_high = Some(v),
                    "min_area_ratio" => self.min_area_ratio = Some(v),
                    "max_area_ratio" => self.max_area_ratio = Some(v),
                    _ => self.aspect_tolerance = Some(v),
                }
            }
            "epsilon_factor" => {
                let v: f64 = value.parse().map_err(|_| bad(value))?;
                if !v.is_finite() || v <= 0.0 {
                    return Err(bad(value));
                }
                self.approx_epsilon_factor = Some(v);
            }
            "adaptive_thresholds" => {
                self.adaptive_thresholds = match value {
                    "true" | "1" => true,
                    "false" | "0" => false,
                    _ => return Err(bad(value)),
                };
            }
            _ => {
                return Err(DetectError::Config(format!("unknown config key: {key}")));
            }
        }

        if let (Some(min), Some(max)) = (self.min_area_ratio, self.max_area_ratio) {
            if min >= max {
                return Err(DetectError::Config(format!(
                    "min_area_ratio {min} must be below max_area_ratio {max}"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_boundaries_select_expected_thresholds() {
        assert_eq!(DetectParams::for_size(399, 600).edge_low, 30.0);
        assert_eq!(DetectParams::for_size(400, 600).edge_low, 25.0);
        assert_eq!(DetectParams::for_size(800, 1000).edge_low, 20.0);
        assert_eq!(DetectParams::for_size(1500, 2000).edge_low, 15.0);
    }

    #[test]
    fn selector_always_returns_valid_bundle() {
        for &(w, h) in &[(1u32, 1u32), (320, 240), (1200, 1200), (5000, 100)] {
            let p = DetectParams::for_size(w, h);
            assert!(p.edge_low > 0.0 && p.edge_high > p.edge_low);
            assert!(p.min_area_ratio > 0.0);
            assert!(p.min_area_ratio < p.max_area_ratio);
            assert!(p.approx_epsilon_factor > 0.0);
        }
    }

    #[test]
    fn wide_frames_halve_min_area_and_loosen_aspect() {
        let normal = DetectParams::for_size(600, 450);
        let wide = DetectParams::for_size(1200, 450);
        assert!(wide.max_area_ratio == normal.max_area_ratio);
        assert!((wide.min_area_ratio - normal.min_area_ratio * 0.5).abs() < 1e-6);
        assert!((wide.aspect_tolerance - normal.aspect_tolerance * 1.2).abs() < 1e-6);
    }

    #[test]
    fn explicit_overrides_beat_adaptive_selection() {
        let mut cfg = DetectorConfig::default();
        cfg.set_key("edge_low", "42").unwrap();
        cfg.set_key("aspect_tolerance", "0.25").unwrap();
        let params = cfg.resolve(640, 480);
        assert_eq!(params.edge_low, 42.0);
        assert_eq!(params.aspect_tolerance, 0.25);
        // Untouched fields still come from the selector.
        assert_eq!(params.edge_high, DetectParams::for_size(640, 480).edge_high);
        assert!(!cfg.use_adaptive_thresholds());
    }

    #[test]
    fn bad_config_values_are_rejected() {
        let mut cfg = DetectorConfig::default();
        assert!(cfg.set_key("edge_low", "not a number").is_err());
        assert!(cfg.set_key("edge_low", "-3").is_err());
        assert!(cfg.set_key("does_not_exist", "1").is_err());
        cfg.set_key("min_area_ratio", "0.5").unwrap();
        assert!(cfg.set_key("max_area_ratio", "0.4").is_err());
    }

    #[test]
    fn with_setters_are_pure() {
        let base = DetectParams::default();
        let tweaked = base.with_edge_thresholds(5.0, 20.0);
        assert_eq!(base.edge_low, 10.0);
        assert_eq!(tweaked.edge_low, 5.0);
        assert_eq!(tweaked.max_area_ratio, base.max_area_ratio);
    }
}
