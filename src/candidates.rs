//! Candidate contour extraction: external closed boundaries from the edge
//! map, admitted by area and the full-frame carve-out rule.

use image::GrayImage;
use imageproc::contours::find_contours;
use imageproc::point::Point;

use crate::imgops;
use crate::types::DetectParams;

/// Full-frame contours are only plausible documents when the frame itself
/// is document-shaped (a tightly cropped card photo).
const FULL_FRAME_ASPECT_MIN: f64 = 1.2;
const FULL_FRAME_ASPECT_MAX: f64 = 2.2;

/// Extract external contours from the edge map and keep those whose
/// enclosed area sits inside the admission window. Returns an empty vec
/// when nothing survives; that is the primary no-document condition.
pub fn extract_candidates(edges: &GrayImage, params: &DetectParams) -> Vec<Vec<Point<i32>>> {
    let (w, h) = edges.dimensions();
    let image_area = w as f64 * h as f64;
    if image_area <= 0.0 {
        return Vec::new();
    }

    let min_area = image_area * params.min_area_ratio as f64;
    let max_area = image_area * params.max_area_ratio as f64;

    let contours = find_contours::<i32>(edges);
    let total = contours.len();

    // Top-level means external here. Border-spanning contours come back
    // classified as holes with no parent, so filtering on the border type
    // would drop the full-frame case before the aspect rule sees it.
    let kept: Vec<Vec<Point<i32>>> = contours
        .into_iter()
        .filter(|c| c.parent.is_none())
        .map(|c| c.points)
        .filter(|points| admit(points, min_area, max_area, w, h))
        .collect();

    tracing::debug!(total, kept = kept.len(), "contour admission");
    kept
}

fn admit(points: &[Point<i32>], min_area: f64, max_area: f64, w: u32, h: u32) -> bool {
    let area = imgops::polygon_area(points);
    if area < min_area || area > max_area {
        return false;
    }

    // A contour spanning the whole frame is usually the frame border, not
    // a document; keep it only when the frame already looks card-shaped.
    if let Some((x, y, bw, bh)) = imgops::bounding_rect(points) {
        if x == 0 && y == 0 && bw == w && bh == h {
            let aspect = bw as f64 / bh as f64;
            return (FULL_FRAME_ASPECT_MIN..=FULL_FRAME_ASPECT_MAX).contains(&aspect);
        }
    }

    true
}
