//! Edge-map preprocessing: working-resolution reduction, local contrast
//! equalization, adaptive blur and Canny thresholding, gap closing.

use image::{DynamicImage, GrayImage};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::close;

use crate::imgops;
use crate::types::{DetectParams, MAX_WORKING_SIDE};

/// CLAHE tile grid and clip limit tuned for small, possibly low-contrast
/// document markings under uneven lighting.
const CLAHE_GRID: u32 = 8;
const CLAHE_CLIP_LIMIT: f32 = 2.0;

/// Adaptive Canny bounds: the dynamic low threshold never drops below 10
/// and the high threshold never exceeds 200.
const DYNAMIC_LOW_FLOOR: f64 = 10.0;
const DYNAMIC_HIGH_CEIL: f64 = 200.0;

/// Grayscale working image plus the scale that maps original pixel space
/// into working space.
pub struct WorkingImage {
    pub gray: GrayImage,
    pub scale: f64,
}

/// Convert to grayscale and bound the longer side at the working
/// resolution cap, retaining the scale factor for corner mapping later.
pub fn working_image(input: &DynamicImage) -> WorkingImage {
    let gray = input.to_luma8();
    let (gray, scale) = imgops::shrink_to_working(&gray, MAX_WORKING_SIDE);
    WorkingImage { gray, scale }
}

/// Produce the binary edge map the candidate extractor consumes.
///
/// When `adaptive` is set, Canny thresholds are derived from the blurred
/// image's mean/stddev instead of the selector values in `params`; the
/// derived pair is discarded in favor of the static one if the statistics
/// collapse it (low >= high on near-uniform images).
pub fn edge_map(working: &GrayImage, params: &DetectParams, adaptive: bool) -> GrayImage {
    let (w, h) = working.dimensions();
    let min_dim = w.min(h);

    let equalized = imgops::clahe(working, CLAHE_GRID, CLAHE_CLIP_LIMIT);

    let kernel = imgops::blur_kernel_size(w, h);
    let blurred = gaussian_blur_f32(&equalized, imgops::gaussian_sigma(kernel));

    let (low, high) = if adaptive {
        let (mean, stddev) = imgops::mean_stddev(&blurred);
        let low = (mean - stddev).max(DYNAMIC_LOW_FLOOR);
        let high = (mean + stddev).min(DYNAMIC_HIGH_CEIL);
        if low < high {
            (low as f32, high as f32)
        } else {
            (params.edge_low, params.edge_high)
        }
    } else {
        (params.edge_low, params.edge_high)
    };
    tracing::debug!(low, high, adaptive, "canny thresholds");

    let edges = canny(&blurred, low, high);

    // Close gaps the edge detector leaves at corners and along faint
    // borders. Kernel tracks resolution: max(2, min_dim / 800).
    let close_kernel = (min_dim / 800).max(2);
    close(&edges, Norm::LInf, (close_kernel / 2).max(1) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn card_scene(w: u32, h: u32) -> GrayImage {
        let mut img = GrayImage::from_pixel(w, h, Luma([210]));
        // Dark centered rectangle occupying roughly a third of the frame.
        let (x0, y0, x1, y1) = (w / 4, h / 3, 3 * w / 4, 2 * h / 3);
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Luma([60]));
            }
        }
        img
    }

    #[test]
    fn working_image_retains_downscale_factor() {
        let scene = DynamicImage::ImageLuma8(card_scene(2400, 1200));
        let working = working_image(&scene);
        assert_eq!(working.gray.dimensions(), (1200, 600));
        assert!((working.scale - 0.5).abs() < 1e-9);
    }

    #[test]
    fn edge_map_marks_rectangle_boundary_only() {
        let scene = card_scene(400, 300);
        let params = DetectParams::for_size(400, 300);
        let edges = edge_map(&scene, &params, true);
        assert_eq!(edges.dimensions(), (400, 300));

        let lit: u32 = edges.pixels().filter(|p| p.0[0] > 0).count() as u32;
        assert!(lit > 0, "no edges found around a high-contrast rectangle");
        // Edges should trace the boundary, not flood the frame.
        assert!(lit < 400 * 300 / 4, "edge map saturated: {lit} pixels lit");
    }

    #[test]
    fn blank_image_produces_empty_edge_map() {
        let blank = GrayImage::from_pixel(300, 300, Luma([127]));
        let params = DetectParams::for_size(300, 300);
        let edges = edge_map(&blank, &params, true);
        assert!(edges.pixels().all(|p| p.0[0] == 0));
    }
}
