//! Output size resolution.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::IntrinsicSize;
use crate::config::OutputConfig;

/// Size limits for rendered output, fixed for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_width: u32,
    pub max_width: u32,
    pub max_height: u32,
}

impl From<&OutputConfig> for Bounds {
    fn from(config: &OutputConfig) -> Self {
        Self {
            min_width: config.min_width,
            max_width: config.max_width,
            max_height: config.max_height,
        }
    }
}

/// Pixel size the document is rasterized at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

/// Resolve the output size for a document with the given intrinsic size.
///
/// One uniform scale factor is derived in a single pass: raise to reach `min_width`, then cap at
/// `max_width`, then cap at `max_height`. Later steps win, so the result can be narrower than
/// `min_width` but never exceeds either maximum. A document without a usable size renders on a
/// `min_width` square.
pub fn resolve_target_size(intrinsic: IntrinsicSize, bounds: Bounds) -> TargetSize {
    let (width, height) = if intrinsic.width <= 0.0 || intrinsic.height <= 0.0 {
        (f64::from(bounds.min_width), f64::from(bounds.min_width))
    } else {
        (intrinsic.width, intrinsic.height)
    };

    let min_width = f64::from(bounds.min_width);
    let max_width = f64::from(bounds.max_width);
    let max_height = f64::from(bounds.max_height);

    let mut scale = 1.0_f64;

    if width * scale < min_width {
        scale = min_width / width;
    }

    if width * scale > max_width {
        scale = max_width / width;
    }

    if height * scale > max_height {
        scale = max_height / height;
    }

    TargetSize {
        width: to_pixels(width * scale),
        height: to_pixels(height * scale),
    }
}

/// Round half away from zero, never below one pixel.
fn to_pixels(value: f64) -> u32 {
    // `as` saturates, and every caller has already capped `value` at a u32 bound
    (value.round() as u32).max(1)
}
