// FFI bindings for C/C++/mobile embedders
use std::ffi::CStr;
use std::os::raw::{c_char, c_float, c_int};
use std::slice;

use crate::{detect_raw, DetectError, DocumentDetector, PixelFormat};

/// Opaque handle to a detector instance
pub struct CardetHandle {
    inner: DocumentDetector,
}

/// Status codes returned by the detection entry points
pub const CARDET_SUCCESS: c_int = 0;
pub const CARDET_INVALID_INPUT: c_int = -1;
pub const CARDET_INVALID_CONFIG: c_int = -2;
pub const CARDET_PROCESSING_ERROR: c_int = -3;
pub const CARDET_NO_DOCUMENT_FOUND: c_int = -4;

/// C-compatible detection result. Corners are normalized [0, 1]
/// coordinates in clockwise order starting at top-left.
#[repr(C)]
pub struct CDocumentBounds {
    pub x1: c_float,
    pub y1: c_float,
    pub x2: c_float,
    pub y2: c_float,
    pub x3: c_float,
    pub y3: c_float,
    pub x4: c_float,
    pub y4: c_float,
    pub confidence: c_float,
    /// Reserved for downstream classification stages; always 0 here.
    pub document_type: c_int,
    /// Reserved for downstream classification stages; always 0 here.
    pub country_code: c_int,
}

fn pixel_format_from_code(code: c_int) -> Option<PixelFormat> {
    match code {
        0 => Some(PixelFormat::Rgb),
        1 => Some(PixelFormat::Rgba),
        2 => Some(PixelFormat::Bgr),
        3 => Some(PixelFormat::Bgra),
        4 => Some(PixelFormat::Grayscale),
        _ => None,
    }
}

fn status_from(err: &DetectError) -> c_int {
    match err {
        DetectError::NoDocument => CARDET_NO_DOCUMENT_FOUND,
        DetectError::Config(_) => CARDET_INVALID_CONFIG,
        DetectError::EmptyImage | DetectError::InvalidInput(_) => CARDET_INVALID_INPUT,
        DetectError::Image(_) => CARDET_PROCESSING_ERROR,
    }
}

/// Create a new detector with default configuration
#[no_mangle]
pub extern "C" fn cardet_new() -> *mut CardetHandle {
    Box::into_raw(Box::new(CardetHandle {
        inner: DocumentDetector::new(),
    }))
}

/// Apply a string key/value configuration setting
///
/// Recognized keys: edge_low, edge_high, min_area_ratio, max_area_ratio,
/// epsilon_factor, aspect_tolerance, adaptive_thresholds.
///
/// # Safety
/// - handle must be a valid pointer returned from cardet_new
/// - key and value must be valid null-terminated UTF-8 strings
#[no_mangle]
pub unsafe extern "C" fn cardet_set_config(
    handle: *mut CardetHandle,
    key: *const c_char,
    value: *const c_char,
) -> c_int {
    if handle.is_null() || key.is_null() || value.is_null() {
        return CARDET_INVALID_INPUT;
    }

    let key = match CStr::from_ptr(key).to_str() {
        Ok(s) => s,
        Err(_) => return CARDET_INVALID_INPUT,
    };
    let value = match CStr::from_ptr(value).to_str() {
        Ok(s) => s,
        Err(_) => return CARDET_INVALID_INPUT,
    };

    match (*handle).inner.config.set_key(key, value) {
        Ok(()) => CARDET_SUCCESS,
        Err(e) => status_from(&e),
    }
}

/// Detect a document boundary in a raw pixel buffer
///
/// format codes: 0 = RGB, 1 = RGBA, 2 = BGR, 3 = BGRA, 4 = grayscale.
/// stride is the byte distance between row starts.
///
/// # Safety
/// - handle must be a valid pointer returned from cardet_new
/// - data must point to at least stride * (height - 1) + row bytes
/// - bounds_out must be a valid pointer to a CDocumentBounds
#[no_mangle]
pub unsafe extern "C" fn cardet_detect(
    handle: *mut CardetHandle,
    data: *const u8,
    data_len: usize,
    width: u32,
    height: u32,
    stride: usize,
    format: c_int,
    bounds_out: *mut CDocumentBounds,
) -> c_int {
    if handle.is_null() || data.is_null() || bounds_out.is_null() {
        return CARDET_INVALID_INPUT;
    }
    let Some(format) = pixel_format_from_code(format) else {
        return CARDET_INVALID_INPUT;
    };

    let detector = &(*handle).inner;
    let buffer = slice::from_raw_parts(data, data_len);

    match detect_raw(detector, buffer, width, height, stride, format) {
        Ok(bounds) => {
            let [(x1, y1), (x2, y2), (x3, y3), (x4, y4)] = bounds.corners;
            *bounds_out = CDocumentBounds {
                x1,
                y1,
                x2,
                y2,
                x3,
                y3,
                x4,
                y4,
                confidence: bounds.confidence,
                document_type: 0,
                country_code: 0,
            };
            CARDET_SUCCESS
        }
        Err(e) => status_from(&e),
    }
}

/// Detect a document boundary in an image file
///
/// # Safety
/// - handle must be a valid pointer returned from cardet_new
/// - image_path must be a valid null-terminated UTF-8 string
/// - bounds_out must be a valid pointer to a CDocumentBounds
#[no_mangle]
pub unsafe extern "C" fn cardet_detect_file(
    handle: *mut CardetHandle,
    image_path: *const c_char,
    bounds_out: *mut CDocumentBounds,
) -> c_int {
    if handle.is_null() || image_path.is_null() || bounds_out.is_null() {
        return CARDET_INVALID_INPUT;
    }

    let path = match CStr::from_ptr(image_path).to_str() {
        Ok(s) => s,
        Err(_) => return CARDET_INVALID_INPUT,
    };

    match (*handle).inner.detect_file(path) {
        Ok(bounds) => {
            let [(x1, y1), (x2, y2), (x3, y3), (x4, y4)] = bounds.corners;
            *bounds_out = CDocumentBounds {
                x1,
                y1,
                x2,
                y2,
                x3,
                y3,
                x4,
                y4,
                confidence: bounds.confidence,
                document_type: 0,
                country_code: 0,
            };
            CARDET_SUCCESS
        }
        Err(e) => status_from(&e),
    }
}

/// Free a detector instance
///
/// # Safety
/// handle must be a valid pointer returned from cardet_new
#[no_mangle]
pub unsafe extern "C" fn cardet_free(handle: *mut CardetHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Get library version
#[no_mangle]
pub extern "C" fn cardet_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}
