//! Pixel-level operations the detection pipeline needs beyond what
//! imageproc ships: tiled local contrast equalization, image statistics,
//! polygon measurement, and raw-buffer layout conversion.

use image::{DynamicImage, GrayImage, RgbImage};
use imageproc::point::Point;

use crate::detector::DetectError;
use crate::types::PixelFormat;

/// Reduce an image so its longer side is at most `max_side`, returning the
/// working image and the applied scale factor (working = original * scale).
/// Downscaling uses box-filter area averaging; images already small enough
/// pass through with scale 1.0.
pub fn shrink_to_working(gray: &GrayImage, max_side: u32) -> (GrayImage, f64) {
    let (w, h) = gray.dimensions();
    let longer = w.max(h);
    if longer <= max_side {
        return (gray.clone(), 1.0);
    }

    let scale = max_side as f64 / longer as f64;
    let new_w = ((w as f64 * scale).round() as u32).max(1);
    let new_h = ((h as f64 * scale).round() as u32).max(1);
    let shrunk = image::imageops::thumbnail(gray, new_w, new_h);
    (shrunk, scale)
}

/// Mean and standard deviation of pixel intensity.
pub fn mean_stddev(img: &GrayImage) -> (f64, f64) {
    let n = (img.width() as u64 * img.height() as u64).max(1) as f64;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for p in img.pixels() {
        let v = p.0[0] as f64;
        sum += v;
        sum_sq += v * v;
    }
    let mean = sum / n;
    let var = (sum_sq / n - mean * mean).max(0.0);
    (mean, var.sqrt())
}

/// Gaussian kernel size for a working image, per the adaptive blur policy:
/// `max(3, min_dim / 400)`, forced odd.
pub fn blur_kernel_size(width: u32, height: u32) -> u32 {
    let mut k = (width.min(height) / 400).max(3);
    if k % 2 == 0 {
        k += 1;
    }
    k
}

/// Sigma equivalent for a given odd kernel size, matching the usual
/// kernel-to-sigma derivation so blur strength tracks kernel size.
pub fn gaussian_sigma(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Contrast-limited adaptive histogram equalization over a `grid` x `grid`
/// tile layout, with per-pixel bilinear interpolation between the tile
/// transfer functions so tile seams stay invisible.
pub fn clahe(img: &GrayImage, grid: u32, clip_limit: f32) -> GrayImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img.clone();
    }

    let grid = grid.max(1);
    let tile_w = w.div_ceil(grid).max(1);
    let tile_h = h.div_ceil(grid).max(1);
    let tiles_x = w.div_ceil(tile_w);
    let tiles_y = h.div_ceil(tile_h);

    // One clipped-histogram LUT per tile.
    let mut luts = vec![[0u8; 256]; (tiles_x * tiles_y) as usize];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[img.get_pixel(x, y).0[0] as usize] += 1;
                }
            }

            let count = ((x1 - x0) * (y1 - y0)) as u32;
            let clip = ((clip_limit * count as f32 / 256.0) as u32).max(1);
            let mut excess = 0u32;
            for bin in hist.iter_mut() {
                if *bin > clip {
                    excess += *bin - clip;
                    *bin = clip;
                }
            }
            let bonus = excess / 256;
            for bin in hist.iter_mut() {
                *bin += bonus;
            }

            let lut = &mut luts[(ty * tiles_x + tx) as usize];
            let mut cdf = 0u32;
            for (v, bin) in hist.iter().enumerate() {
                cdf += *bin;
                lut[v] = ((cdf as f32 * 255.0 / count as f32).round() as u32).min(255) as u8;
            }
        }
    }

    let lut_at = |tx: u32, ty: u32, v: u8| luts[(ty * tiles_x + tx) as usize][v as usize] as f32;

    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let fy = ((y as f32 + 0.5) / tile_h as f32 - 0.5).clamp(0.0, (tiles_y - 1) as f32);
        let ty0 = fy.floor() as u32;
        let ty1 = (ty0 + 1).min(tiles_y - 1);
        let ay = fy - ty0 as f32;

        for x in 0..w {
            let fx = ((x as f32 + 0.5) / tile_w as f32 - 0.5).clamp(0.0, (tiles_x - 1) as f32);
            let tx0 = fx.floor() as u32;
            let tx1 = (tx0 + 1).min(tiles_x - 1);
            let ax = fx - tx0 as f32;

            let v = img.get_pixel(x, y).0[0];
            let top = lut_at(tx0, ty0, v) * (1.0 - ax) + lut_at(tx1, ty0, v) * ax;
            let bottom = lut_at(tx0, ty1, v) * (1.0 - ax) + lut_at(tx1, ty1, v) * ax;
            let mapped = top * (1.0 - ay) + bottom * ay;
            out.put_pixel(x, y, image::Luma([mapped.round().clamp(0.0, 255.0) as u8]));
        }
    }

    out
}

/// Simplify a closed polygon with Douglas-Peucker at the given epsilon.
///
/// `approximate_polygon_dp` treats the wrap-around back to the first
/// vertex as one straight segment and can drop corners lying on it (an
/// exact rectangle loses its fourth vertex). Re-split the flattened tail
/// so every vertex deviating beyond epsilon survives.
pub fn simplify_closed(contour: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    let mut polygon = imageproc::geometry::approximate_polygon_dp(contour, epsilon, true);
    let (Some(&first), Some(&last)) = (polygon.first(), polygon.last()) else {
        return polygon;
    };
    if let Some(tail_start) = contour.iter().rposition(|p| *p == last) {
        let tail = &contour[tail_start + 1..];
        split_on_deviation(tail, last, first, epsilon, &mut polygon);
    }
    polygon
}

/// Recursive Douglas-Peucker split of `points` against the chord from
/// `a` to `b`, appending retained vertices in order.
fn split_on_deviation(
    points: &[Point<i32>],
    a: Point<i32>,
    b: Point<i32>,
    epsilon: f64,
    out: &mut Vec<Point<i32>>,
) {
    let Some((idx, dist)) = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i, segment_distance(*p, a, b)))
        .max_by(|x, y| x.1.partial_cmp(&y.1).unwrap_or(std::cmp::Ordering::Equal))
    else {
        return;
    };
    if dist > epsilon {
        split_on_deviation(&points[..idx], a, points[idx], epsilon, out);
        out.push(points[idx]);
        split_on_deviation(&points[idx + 1..], points[idx], b, epsilon, out);
    }
}

/// Distance from `p` to the segment between `a` and `b`.
fn segment_distance(p: Point<i32>, a: Point<i32>, b: Point<i32>) -> f64 {
    let (px, py) = (p.x as f64, p.y as f64);
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (dx, dy) = (b.x as f64 - ax, b.y as f64 - ay);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0)
    };
    ((px - ax - t * dx).powi(2) + (py - ay - t * dy).powi(2)).sqrt()
}

/// Enclosed polygon area via the shoelace formula.
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut area = 0.0f64;
    for i in 0..points.len() {
        let p = points[i];
        let q = points[(i + 1) % points.len()];
        area += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
    }
    (area * 0.5).abs()
}

/// Axis-aligned bounding rectangle as (x, y, width, height).
pub fn bounding_rect(points: &[Point<i32>]) -> Option<(i32, i32, u32, u32)> {
    let first = points.first()?;
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    Some((
        min_x,
        min_y,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    ))
}

/// Approximate minimum enclosing circle (Ritter's bounding sphere):
/// two-pass diameter estimate, then grow to cover stragglers.
/// Deterministic and within a few percent of optimal, which is all the
/// centeredness score needs.
pub fn min_enclosing_circle(points: &[Point<i32>]) -> Option<((f32, f32), f32)> {
    let first = *points.first()?;

    let dist_sq = |a: (f32, f32), b: (f32, f32)| {
        let dx = a.0 - b.0;
        let dy = a.1 - b.1;
        dx * dx + dy * dy
    };
    let as_f32 = |p: Point<i32>| (p.x as f32, p.y as f32);

    let farthest_from = |origin: (f32, f32)| {
        points
            .iter()
            .copied()
            .map(as_f32)
            .max_by(|a, b| {
                dist_sq(*a, origin)
                    .partial_cmp(&dist_sq(*b, origin))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(origin)
    };

    let p1 = farthest_from(as_f32(first));
    let p2 = farthest_from(p1);

    let mut center = ((p1.0 + p2.0) / 2.0, (p1.1 + p2.1) / 2.0);
    let mut radius = dist_sq(p1, p2).sqrt() / 2.0;

    for p in points.iter().copied().map(as_f32) {
        let d = dist_sq(p, center).sqrt();
        if d > radius {
            let new_radius = (radius + d) / 2.0;
            let shift = (new_radius - radius) / d.max(f32::EPSILON);
            center = (
                center.0 + (p.0 - center.0) * shift,
                center.1 + (p.1 - center.1) * shift,
            );
            radius = new_radius;
        }
    }

    Some((center, radius))
}

/// Build an image from a raw pixel buffer with explicit stride and layout.
/// Non-grayscale inputs land in RGB channel order regardless of source
/// layout; the alpha channel, when present, is dropped.
pub fn image_from_raw(
    data: &[u8],
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
) -> Result<DynamicImage, DetectError> {
    if width == 0 || height == 0 {
        return Err(DetectError::EmptyImage);
    }

    let bpp = format.bytes_per_pixel();
    let row_bytes = width as usize * bpp;
    if stride < row_bytes {
        return Err(DetectError::InvalidInput(format!(
            "stride {stride} shorter than row of {row_bytes} bytes"
        )));
    }
    let needed = stride * (height as usize - 1) + row_bytes;
    if data.len() < needed {
        return Err(DetectError::InvalidInput(format!(
            "buffer holds {} bytes, {} needed for {}x{} at stride {}",
            data.len(),
            needed,
            width,
            height,
            stride
        )));
    }

    if format == PixelFormat::Grayscale {
        let mut out = GrayImage::new(width, height);
        for y in 0..height {
            let row = &data[y as usize * stride..];
            for x in 0..width {
                out.put_pixel(x, y, image::Luma([row[x as usize]]));
            }
        }
        return Ok(DynamicImage::ImageLuma8(out));
    }

    let swap_rb = matches!(format, PixelFormat::Bgr | PixelFormat::Bgra);
    let mut out = RgbImage::new(width, height);
    for y in 0..height {
        let row = &data[y as usize * stride..];
        for x in 0..width {
            let px = &row[x as usize * bpp..x as usize * bpp + bpp];
            let (r, b) = if swap_rb { (px[2], px[0]) } else { (px[0], px[2]) };
            out.put_pixel(x, y, image::Rgb([r, px[1], b]));
        }
    }
    Ok(DynamicImage::ImageRgb8(out))
}
