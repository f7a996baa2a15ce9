//! The detection pipeline: preprocessing, candidate extraction, scoring,
//! corner resolution/ordering, and bounds normalization.

use std::path::Path;

use image::DynamicImage;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};

use crate::score::ScoreWeights;
use crate::types::DetectorConfig;
use crate::{candidates, corners, preprocess, score};

#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("empty input image")]
    EmptyImage,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("image error: {0}")]
    Image(String),

    /// Uniform outward signal for every mid-pipeline failure: no
    /// surviving contours, best score at or below the floor, or corner
    /// resolution falling short of four points.
    #[error("no document found")]
    NoDocument,
}

impl From<image::ImageError> for DetectError {
    fn from(err: image::ImageError) -> Self {
        DetectError::Image(err.to_string())
    }
}

/// Detected document boundary in normalized [0, 1] coordinates.
///
/// Corners run clockwise: top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocumentBounds {
    pub corners: [(f32, f32); 4],
    pub confidence: f32,
}

impl DocumentBounds {
    /// Map the normalized corners back into pixel space for an image of
    /// the given dimensions.
    pub fn to_pixel_corners(&self, width: u32, height: u32) -> [(f32, f32); 4] {
        self.corners
            .map(|(x, y)| (x * width as f32, y * height as f32))
    }
}

/// ID-1 document boundary detector.
///
/// Stateless between calls: each detection resolves its own parameter
/// bundle from the working resolution (or explicit configuration), so a
/// single detector is safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct DocumentDetector {
    pub config: DetectorConfig,
    pub weights: ScoreWeights,
}

impl DocumentDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        Self {
            config,
            weights: ScoreWeights::default(),
        }
    }

    /// Locate the document boundary in `image`.
    ///
    /// Returns `DetectError::NoDocument` whenever any stage comes up
    /// empty; all other variants indicate unusable input, never a
    /// mid-pipeline fault.
    pub fn detect(&self, image: &DynamicImage) -> Result<DocumentBounds, DetectError> {
        let (orig_w, orig_h) = (image.width(), image.height());
        if orig_w == 0 || orig_h == 0 {
            return Err(DetectError::EmptyImage);
        }

        let working = preprocess::working_image(image);
        let (work_w, work_h) = working.gray.dimensions();
        let params = self.config.resolve(work_w, work_h);
        tracing::debug!(orig_w, orig_h, work_w, work_h, scale = working.scale, "detect");

        let edges = preprocess::edge_map(
            &working.gray,
            &params,
            self.config.use_adaptive_thresholds(),
        );

        let contours = candidates::extract_candidates(&edges, &params);
        if contours.is_empty() {
            tracing::debug!("no contours survived admission");
            return Err(DetectError::NoDocument);
        }

        let best = score::best_candidate(&contours, work_w, work_h, &params, &self.weights)
            .ok_or(DetectError::NoDocument)?;

        let quad = corners::resolve_corners(&best.polygon).ok_or(DetectError::NoDocument)?;
        let ordered = corners::order_corners(quad).ok_or(DetectError::NoDocument)?;

        Ok(normalize_bounds(
            ordered,
            working.scale,
            orig_w,
            orig_h,
            best.score,
        ))
    }

    /// Convenience wrapper: decode an image file and detect.
    pub fn detect_file<P: AsRef<Path>>(&self, path: P) -> Result<DocumentBounds, DetectError> {
        let img = image::open(path)?;
        self.detect(&img)
    }
}

/// Map working-resolution corners back to original pixel space, then to
/// normalized coordinates, attaching the winning score as confidence.
fn normalize_bounds(
    ordered: [Point<i32>; 4],
    scale: f64,
    orig_w: u32,
    orig_h: u32,
    confidence: f32,
) -> DocumentBounds {
    let corners = ordered.map(|p| {
        let px = p.x as f64 / scale;
        let py = p.y as f64 / scale;
        (
            (px / orig_w as f64).clamp(0.0, 1.0) as f32,
            (py / orig_h as f64).clamp(0.0, 1.0) as f32,
        )
    });
    DocumentBounds {
        corners,
        confidence: confidence.clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn empty_image_is_rejected_before_processing() {
        let detector = DocumentDetector::new();
        let empty = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
        assert!(matches!(detector.detect(&empty), Err(DetectError::EmptyImage)));
    }

    #[test]
    fn blank_image_reports_no_document() {
        let detector = DocumentDetector::new();
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(320, 240, Luma([180])));
        assert!(matches!(detector.detect(&blank), Err(DetectError::NoDocument)));
    }

    #[test]
    fn normalization_round_trips_to_pixel_space() {
        let ordered = [
            Point::new(120, 90),
            Point::new(520, 95),
            Point::new(515, 340),
            Point::new(118, 338),
        ];
        // Working image was the original halved: scale 0.5.
        let bounds = normalize_bounds(ordered, 0.5, 1280, 960, 0.87);

        for &(x, y) in &bounds.corners {
            assert!((0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y));
        }
        assert!((bounds.confidence - 0.87).abs() < 1e-6);

        let pixels = bounds.to_pixel_corners(1280, 960);
        for (i, &(px, py)) in pixels.iter().enumerate() {
            let expected_x = ordered[i].x as f32 / 0.5;
            let expected_y = ordered[i].y as f32 / 0.5;
            assert!((px - expected_x).abs() < 0.5, "corner {i} x drifted");
            assert!((py - expected_y).abs() < 0.5, "corner {i} y drifted");
        }
    }

    #[test]
    fn confidence_is_clamped_into_unit_range() {
        let ordered = [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        let bounds = normalize_bounds(ordered, 1.0, 100, 100, 1.3);
        assert_eq!(bounds.confidence, 1.0);
    }
}
