//! Document-likelihood scoring: four independent sub-scores combined by a
//! declarative weight record, plus best-candidate selection.

use imageproc::geometry::arc_length;
use imageproc::point::Point;

use crate::imgops;
use crate::types::{DetectParams, MIN_DOCUMENT_SCORE};

/// Relative weight of each sub-score. Aspect carries the most weight
/// since the ID-1 ratio is the most discriminative signal; shape carries
/// the least since real cards have rounded corners.
#[derive(Clone, Copy, Debug)]
pub struct ScoreWeights {
    pub area: f32,
    pub aspect: f32,
    pub shape: f32,
    pub center: f32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            area: 0.25,
            aspect: 0.40,
            shape: 0.15,
            center: 0.20,
        }
    }
}

/// A simplified candidate polygon and its combined score.
#[derive(Clone, Debug)]
pub struct ScoredCandidate {
    pub polygon: Vec<Point<i32>>,
    pub score: f32,
}

/// Area sub-score from the candidate's share of the frame. Mid-range
/// shares are ideal; near-full-frame still scores high (tightly cropped
/// card photos); anything outside [0.002, 0.99] scores zero.
pub fn area_score(area_ratio: f64) -> f32 {
    if !(0.002..=0.99).contains(&area_ratio) {
        0.0
    } else if (0.01..=0.70).contains(&area_ratio) {
        1.0
    } else if area_ratio > 0.85 {
        0.9
    } else {
        0.5
    }
}

/// Aspect sub-score: linear falloff of the bounding-box ratio's relative
/// distance from the target, reaching zero at the tolerance bound.
pub fn aspect_score(bbox_w: u32, bbox_h: u32, params: &DetectParams) -> f32 {
    if bbox_h == 0 {
        return 0.0;
    }
    let ratio = bbox_w as f32 / bbox_h as f32;
    let diff = (ratio - params.target_aspect_ratio).abs() / params.target_aspect_ratio;
    (1.0 - diff / params.aspect_tolerance).max(0.0)
}

/// Shape-regularity sub-score from the simplified vertex count. Exactly 4
/// is a clean quadrilateral; up to 12 tolerates rounded corners.
pub fn shape_score(vertex_count: usize) -> f32 {
    match vertex_count {
        4 => 1.0,
        5..=8 => 0.8,
        9..=12 => 0.5,
        _ => 0.0,
    }
}

/// Centeredness sub-score: distance of the candidate's enclosing-circle
/// center from the image center, normalized by the half-diagonal.
pub fn center_score(points: &[Point<i32>], width: u32, height: u32) -> f32 {
    let Some(((cx, cy), _)) = imgops::min_enclosing_circle(points) else {
        return 0.0;
    };
    let icx = width as f32 / 2.0;
    let icy = height as f32 / 2.0;
    let half_diag = (icx * icx + icy * icy).sqrt();
    if half_diag <= 0.0 {
        return 0.0;
    }
    let dist = ((cx - icx).powi(2) + (cy - icy).powi(2)).sqrt();
    (1.0 - dist / half_diag).clamp(0.0, 1.0)
}

/// Combined document-likelihood score in [0, 1] for a simplified polygon.
pub fn document_score(
    polygon: &[Point<i32>],
    width: u32,
    height: u32,
    params: &DetectParams,
    weights: &ScoreWeights,
) -> f32 {
    if polygon.len() < 4 {
        return 0.0;
    }
    let image_area = width as f64 * height as f64;
    if image_area <= 0.0 {
        return 0.0;
    }

    let area_ratio = imgops::polygon_area(polygon) / image_area;
    let (bw, bh) = match imgops::bounding_rect(polygon) {
        Some((_, _, bw, bh)) => (bw, bh),
        None => return 0.0,
    };

    area_score(area_ratio) * weights.area
        + aspect_score(bw, bh, params) * weights.aspect
        + shape_score(polygon.len()) * weights.shape
        + center_score(polygon, width, height) * weights.center
}

/// Simplify every candidate and pick the highest-scoring one; ties keep
/// the first encountered. Returns `None` when the best score does not
/// clear the noise floor.
pub fn best_candidate(
    contours: &[Vec<Point<i32>>],
    width: u32,
    height: u32,
    params: &DetectParams,
    weights: &ScoreWeights,
) -> Option<ScoredCandidate> {
    let mut best: Option<ScoredCandidate> = None;

    for contour in contours {
        let perimeter = arc_length(contour, true);
        if perimeter <= 0.0 {
            continue;
        }
        let epsilon = params.approx_epsilon_factor * perimeter;
        let polygon = imgops::simplify_closed(contour, epsilon);
        let score = document_score(&polygon, width, height, params, weights);

        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(ScoredCandidate { polygon, score });
        }
    }

    let best = best?;
    tracing::debug!(score = best.score, vertices = best.polygon.len(), "best candidate");
    if best.score > MIN_DOCUMENT_SCORE {
        Some(best)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: i32, y0: i32, w: i32, h: i32) -> Vec<Point<i32>> {
        vec![
            Point::new(x0, y0),
            Point::new(x0 + w, y0),
            Point::new(x0 + w, y0 + h),
            Point::new(x0, y0 + h),
        ]
    }

    #[test]
    fn area_score_bands() {
        assert_eq!(area_score(0.001), 0.0);
        assert_eq!(area_score(0.005), 0.5);
        assert_eq!(area_score(0.35), 1.0);
        assert_eq!(area_score(0.75), 0.5);
        assert_eq!(area_score(0.9), 0.9);
        assert_eq!(area_score(0.995), 0.0);
    }

    #[test]
    fn aspect_score_peaks_at_target_ratio() {
        let params = DetectParams::default();
        // 1586 x 1000 is the ID-1 ratio exactly.
        assert!((aspect_score(1586, 1000, &params) - 1.0).abs() < 1e-3);
        // A square is 37% off the target, near the 40% tolerance edge.
        let square = aspect_score(100, 100, &params);
        assert!(square > 0.0 && square < 0.15);
        // Far outside tolerance floors at zero.
        assert_eq!(aspect_score(400, 100, &params), 0.0);
        assert_eq!(aspect_score(100, 0, &params), 0.0);
    }

    #[test]
    fn shape_score_prefers_clean_quadrilaterals() {
        assert_eq!(shape_score(4), 1.0);
        assert_eq!(shape_score(6), 0.8);
        assert_eq!(shape_score(12), 0.5);
        assert_eq!(shape_score(3), 0.0);
        assert_eq!(shape_score(20), 0.0);
    }

    #[test]
    fn center_score_drops_toward_corners() {
        let centered = rect(400, 250, 200, 100);
        let cornered = rect(0, 0, 200, 100);
        let c = center_score(&centered, 1000, 600);
        let k = center_score(&cornered, 1000, 600);
        assert!(c > 0.95);
        assert!(k < c);
    }

    #[test]
    fn ideal_card_polygon_scores_high() {
        // Centered, ID-1 aspect, 33% of frame area.
        let poly = rect(303, 179, 634, 400);
        let params = DetectParams::for_size(1200, 758);
        let score = document_score(&poly, 1200, 758, &params, &ScoreWeights::default());
        assert!(score > 0.9, "score {score}");
    }

    #[test]
    fn degenerate_polygons_score_zero() {
        let params = DetectParams::default();
        let weights = ScoreWeights::default();
        assert_eq!(document_score(&[], 100, 100, &params, &weights), 0.0);
        let line = vec![Point::new(0, 0), Point::new(50, 0), Point::new(99, 0)];
        assert_eq!(document_score(&line, 100, 100, &params, &weights), 0.0);
    }

    #[test]
    fn best_candidate_picks_card_over_noise() {
        let card = rect(300, 180, 634, 400);
        let blob = rect(10, 10, 80, 80);
        let params = DetectParams::for_size(1200, 758).with_area_ratios(0.001, 0.99);
        let best = best_candidate(
            &[blob, card.clone()],
            1200,
            758,
            &params,
            &ScoreWeights::default(),
        )
        .expect("card should clear the floor");
        assert_eq!(best.polygon, card);
    }

    #[test]
    fn noise_below_floor_yields_none() {
        // A tiny jagged star near the corner: sub-threshold area, wrong
        // shape class, far off center. Nothing for the floor to forgive.
        let star: Vec<Point<i32>> = (0..20)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::TAU / 20.0;
                let r = if i % 2 == 0 { 20.0 } else { 10.0 };
                Point::new(
                    (80.0 + r * angle.cos()).round() as i32,
                    (80.0 + r * angle.sin()).round() as i32,
                )
            })
            .collect();
        let params = DetectParams::for_size(1200, 758).with_area_ratios(0.0001, 0.99);
        assert!(best_candidate(&[star], 1200, 758, &params, &ScoreWeights::default()).is_none());
    }
}
