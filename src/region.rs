//! Turns the two raw corners of a drag into the box that actually gets captured.
//!
//! The result is ordered, clamped to the screen, and at least `min_size`
//! wide and tall whenever the screen itself allows it.

use crate::geometry::{Point, Rectangle};

pub const DEFAULT_MIN_SIZE: u32 = 30;

/// Normalizes `begin`/`end` (any order) against a `screen_width` x `screen_height` screen.
pub fn normalize(
    begin: Point,
    end: Point,
    screen_width: u32,
    screen_height: u32,
    min_size: u32,
) -> Rectangle {
    let raw = Rectangle::from_corners(begin, end);
    let (min_x, max_x) = fit_axis(raw.min_x, raw.max_x, screen_width, min_size);
    let (min_y, max_y) = fit_axis(raw.min_y, raw.max_y, screen_height, min_size);

    Rectangle { min_x, min_y, max_x, max_y }
}

/// One axis: clamp into `[0, dim]`, then grow around the midpoint to `min_size`.
///
/// A grown range that pokes past an edge is slid back inside instead of being
/// cut, so it keeps its full `min_size`.
fn fit_axis(lo: i32, hi: i32, dim: u32, min_size: u32) -> (i32, i32) {
    let dim = dim as i32;
    let min_size = min_size as i32;
    let lo = lo.clamp(0, dim);
    let hi = hi.clamp(0, dim);
    if hi - lo >= min_size {
        return (lo, hi);
    }
    if dim <= min_size {
        return (0, dim);
    }

    let mid = (lo + hi) / 2;
    let mut start = mid - min_size / 2;
    let mut stop = start + min_size;
    if start < 0 {
        stop -= start;
        start = 0;
    }
    if stop > dim {
        start -= stop - dim;
        stop = dim;
    }
    (start, stop)
}
