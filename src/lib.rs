//! # cardet - ID-1 Document Boundary Detection
//!
//! cardet locates the boundary of an ISO/IEC 7810 ID-1 document (credit
//! cards, national ID cards, driver's licenses) in a photo and returns its
//! four corners in normalized coordinates, plus a confidence score.
//!
//! ## Features
//!
//! - **Pure Rust**: classical contour pipeline, no OpenCV dependency
//! - **Resolution Adaptive**: tuning buckets from webcam to 12MP+ frames
//! - **Deterministic**: identical input always yields identical corners
//! - **Memory Safe**: leverages Rust's safety guarantees
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cardet::DocumentDetector;
//!
//! let detector = DocumentDetector::new();
//! let bounds = detector.detect_file("card.jpg")?;
//!
//! for (x, y) in bounds.corners {
//!     println!("({x:.4}, {y:.4})");
//! }
//! println!("confidence: {:.3}", bounds.confidence);
//! # Ok::<(), cardet::DetectError>(())
//! ```

// Core modules
mod candidates;
mod corners;
mod detector;
mod imgops;
mod preprocess;
mod score;
mod types;

// FFI module for C bindings
#[cfg(feature = "ffi")]
pub mod ffi;

// Public API exports
pub use crate::detector::{DetectError, DocumentBounds, DocumentDetector};
pub use crate::score::ScoreWeights;
pub use crate::types::{
    DetectParams, DetectorConfig, PixelFormat, ID1_ASPECT_RATIO, MAX_WORKING_SIDE,
    MIN_DOCUMENT_SCORE,
};

use image::DynamicImage;

/// Detect a document boundary in a raw pixel buffer, the entry point the
/// embedding boundary layer uses. `stride` is the byte distance between
/// row starts and may exceed `width * bytes_per_pixel` for padded buffers.
pub fn detect_raw(
    detector: &DocumentDetector,
    data: &[u8],
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
) -> Result<DocumentBounds, DetectError> {
    let img: DynamicImage = imgops::image_from_raw(data, width, height, stride, format)?;
    detector.detect(&img)
}
