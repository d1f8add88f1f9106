//! Face compositing.
//!
//! Pastes a (rescaled) replacement image into a rectangular region of a host image. The host
//! image is never mutated; every call produces a fresh copy.

use crate::image::{Image, Rect};
use crate::{Error, Result};

/// Produces a copy of `source` with the pixels of `region` replaced by `replacement`, rescaled
/// to the region's exact size.
///
/// The replacement is resized with a bilinear filter, since generated faces are typically much
/// smaller (28×28) than the region they are pasted into. The operation is pure: the same inputs
/// always produce the same output, and `source` is left untouched.
///
/// If any pixel of `region` falls outside of `source` (including a negative origin), the call
/// fails with [`Error::OutOfBounds`] before any pixel is written. Detector output touching an
/// image edge therefore fails predictably instead of being silently clipped.
///
/// # Panics
///
/// Panics if `region` has zero width or height; callers are expected to have rejected
/// degenerate detections already.
pub fn composite(source: &Image, region: Rect, replacement: &Image) -> Result<Image> {
    assert!(
        region.width() > 0 && region.height() > 0,
        "composite region must have non-zero size, got {:?}",
        region,
    );

    if !source.rect().contains_rect(&region) {
        // Report the corner that sticks out.
        let x = if region.x() < 0 {
            i64::from(region.x())
        } else {
            i64::from(region.x()) + i64::from(region.width()) - 1
        };
        let y = if region.y() < 0 {
            i64::from(region.y())
        } else {
            i64::from(region.y()) + i64::from(region.height()) - 1
        };
        return Err(Error::OutOfBounds {
            x,
            y,
            width: source.width(),
            height: source.height(),
        });
    }

    let scaled = replacement.resize(region.width(), region.height());

    // The bounds check above guarantees a non-negative origin.
    let (x0, y0) = (region.x() as u32, region.y() as u32);
    let mut out = source.clone();
    for y in 0..scaled.height() {
        for x in 0..scaled.width() {
            out.set(x0 + x, y0 + y, scaled.get(x, y));
        }
    }

    Ok(out)
}
