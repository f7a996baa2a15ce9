//! Corner resolution and canonical ordering: reduce a winning polygon to
//! exactly four corners, then order them clockwise from top-left.

use imageproc::geometry::{arc_length, convex_hull};
use imageproc::point::Point;

use crate::imgops;

/// Hull re-simplification epsilon: 2% of hull perimeter.
const HULL_EPSILON_FACTOR: f64 = 0.02;

/// Quads whose area collapses below this are treated as degenerate
/// (near-collinear corner sets) and fail closed.
const MIN_QUAD_AREA: f64 = 1.0;

/// Reduce a simplified candidate polygon to exactly four corner points.
///
/// Quadrilaterals pass through untouched. Rounded-rectangle shapes go
/// through convex hull, then hull re-simplification, then fall back to
/// the four extreme points. Returns `None` when no stage can produce
/// four distinct corners.
pub fn resolve_corners(polygon: &[Point<i32>]) -> Option<[Point<i32>; 4]> {
    if polygon.len() < 4 {
        return None;
    }
    if polygon.len() == 4 {
        return Some([polygon[0], polygon[1], polygon[2], polygon[3]]);
    }

    let hull = convex_hull(polygon);
    if hull.len() == 4 {
        return Some([hull[0], hull[1], hull[2], hull[3]]);
    }
    if hull.len() < 4 {
        return None;
    }

    let epsilon = HULL_EPSILON_FACTOR * arc_length(&hull, true);
    let simplified = imgops::simplify_closed(&hull, epsilon);
    match simplified.len() {
        4 => Some([simplified[0], simplified[1], simplified[2], simplified[3]]),
        n if n > 4 => extreme_points(&simplified),
        // The hull collapsed to a sliver under simplification; there is
        // no quadrilateral here to recover.
        _ => None,
    }
}

/// Fall back to the leftmost / rightmost / topmost / bottommost points,
/// deduplicated. Only succeeds when that still leaves four corners.
fn extreme_points(points: &[Point<i32>]) -> Option<[Point<i32>; 4]> {
    let leftmost = *points.iter().min_by_key(|p| (p.x, p.y))?;
    let rightmost = *points.iter().max_by_key(|p| (p.x, p.y))?;
    let topmost = *points.iter().min_by_key(|p| (p.y, p.x))?;
    let bottommost = *points.iter().max_by_key(|p| (p.y, p.x))?;

    let mut corners = vec![leftmost, rightmost, topmost, bottommost];
    corners.sort_by_key(|p| (p.x, p.y));
    corners.dedup();
    if corners.len() == 4 {
        Some([corners[0], corners[1], corners[2], corners[3]])
    } else {
        None
    }
}

/// Order four corners clockwise starting at the one nearest the image
/// origin, independent of input permutation or winding.
///
/// Sorts by angle around the centroid (ascending `atan2` is clockwise in
/// y-down image coordinates), then rotates so the corner closest to
/// (0, 0) comes first, yielding (top-left, top-right, bottom-right,
/// bottom-left). Degenerate sets (duplicate corners or a quad whose
/// area vanishes) fail closed with `None`.
pub fn order_corners(corners: [Point<i32>; 4]) -> Option<[Point<i32>; 4]> {
    for i in 0..4 {
        for j in i + 1..4 {
            if corners[i] == corners[j] {
                return None;
            }
        }
    }

    let cx = corners.iter().map(|p| p.x as f64).sum::<f64>() / 4.0;
    let cy = corners.iter().map(|p| p.y as f64).sum::<f64>() / 4.0;

    let mut by_angle = corners;
    by_angle.sort_by(|a, b| {
        let angle_a = (a.y as f64 - cy).atan2(a.x as f64 - cx);
        let angle_b = (b.y as f64 - cy).atan2(b.x as f64 - cx);
        angle_a
            .partial_cmp(&angle_b)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    if imgops::polygon_area(&by_angle) < MIN_QUAD_AREA {
        return None;
    }

    let origin_dist_sq = |p: &Point<i32>| p.x as i64 * p.x as i64 + p.y as i64 * p.y as i64;
    let start = (0..4)
        .min_by_key(|&i| origin_dist_sq(&by_angle[i]))
        .unwrap_or(0);

    Some([
        by_angle[start],
        by_angle[(start + 1) % 4],
        by_angle[(start + 2) % 4],
        by_angle[(start + 3) % 4],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    const TL: Point<i32> = Point { x: 10, y: 20 };
    const TR: Point<i32> = Point { x: 200, y: 25 };
    const BR: Point<i32> = Point { x: 205, y: 140 };
    const BL: Point<i32> = Point { x: 12, y: 138 };

    #[test]
    fn ordering_is_permutation_invariant() {
        let expected = order_corners([TL, TR, BR, BL]).unwrap();
        assert_eq!(expected[0], TL);
        assert_eq!(expected[1], TR);
        assert_eq!(expected[2], BR);
        assert_eq!(expected[3], BL);

        // All 24 input permutations must agree.
        let pts = [TL, TR, BR, BL];
        for a in 0..4 {
            for b in 0..4 {
                for c in 0..4 {
                    for d in 0..4 {
                        let idx = [a, b, c, d];
                        let mut seen = [false; 4];
                        idx.iter().for_each(|&i| seen[i] = true);
                        if seen != [true; 4] {
                            continue;
                        }
                        let permuted = [pts[a], pts[b], pts[c], pts[d]];
                        assert_eq!(order_corners(permuted).unwrap(), expected);
                    }
                }
            }
        }
    }

    #[test]
    fn degenerate_corner_sets_fail_closed() {
        assert!(order_corners([TL, TL, BR, BL]).is_none());
        // Collinear points enclose no area.
        let collinear = [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(20, 0),
            Point::new(30, 0),
        ];
        assert!(order_corners(collinear).is_none());
    }

    #[test]
    fn quadrilateral_passes_through_resolution() {
        let quad = [TL, TR, BR, BL];
        assert_eq!(resolve_corners(&quad).unwrap(), quad);
    }

    #[test]
    fn rounded_rectangle_resolves_to_four_corners() {
        // Rectangle with chamfered corners: 8 vertices.
        let rounded = vec![
            Point::new(20, 10),
            Point::new(180, 10),
            Point::new(200, 30),
            Point::new(200, 110),
            Point::new(180, 130),
            Point::new(20, 130),
            Point::new(0, 110),
            Point::new(0, 30),
        ];
        let corners = resolve_corners(&rounded).expect("should resolve");
        let ordered = order_corners(corners).expect("should order");
        // Four distinct corners bracketing the rectangle's extent to
        // within the simplification epsilon.
        let (x, y, w, h) = imgops::bounding_rect(&ordered).unwrap();
        assert!(x <= 15 && y <= 25, "bounding rect drifted: ({x}, {y})");
        assert!(w >= 170 && h >= 90, "bounding rect shrank: {w}x{h}");
    }

    #[test]
    fn sliver_hull_fails_instead_of_fabricating_corners() {
        // Convex hexagon flattened to a 100x2 sliver: hull simplification
        // collapses it below four vertices, and no extreme-point fallback
        // should invent a quadrilateral from it.
        let sliver = vec![
            Point::new(0, 0),
            Point::new(30, 1),
            Point::new(70, 1),
            Point::new(100, 0),
            Point::new(70, -1),
            Point::new(30, -1),
        ];
        assert!(resolve_corners(&sliver).is_none());
    }

    #[test]
    fn too_few_vertices_cannot_resolve() {
        let tri = [Point::new(0, 0), Point::new(50, 0), Point::new(25, 40)];
        assert!(resolve_corners(&tri).is_none());
    }
}
