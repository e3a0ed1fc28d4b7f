//! Geometric helpers on canonical `(y_min, x_min, y_max, x_max)` boxes.

use super::format::Box4;

/// Returns the height of a canonical box. Negative if the box is malformed.
#[inline]
pub fn height(b: &Box4) -> f64 {
    b[2] - b[0]
}

/// Returns the width of a canonical box. Negative if the box is malformed.
#[inline]
pub fn width(b: &Box4) -> f64 {
    b[3] - b[1]
}

/// Returns `(y_max - y_min) * (x_max - x_min)`.
///
/// May be negative if the box is malformed.
#[inline]
pub fn area(b: &Box4) -> f64 {
    height(b) * width(b)
}

/// Intersection over union of two canonical boxes.
///
/// Returns 0.0 when the boxes do not overlap or either has non-positive area.
pub fn iou(a: &Box4, b: &Box4) -> f64 {
    let (h_a, w_a) = (height(a), width(a));
    let (h_b, w_b) = (height(b), width(b));
    if h_a <= 0.0 || w_a <= 0.0 || h_b <= 0.0 || w_b <= 0.0 {
        return 0.0;
    }

    let inter_h = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let inter_w = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let intersection = inter_h * inter_w;
    if intersection <= 0.0 {
        return 0.0;
    }

    let union = h_a * w_a + h_b * w_b - intersection;
    (intersection / union).clamp(0.0, 1.0)
}

/// Clamps y coordinates into `[0, height]` and x coordinates into `[0, width]`.
///
/// Never panics; a negative or NaN extent gives a meaningless box, so
/// callers validate image sizes first.
#[inline]
pub fn clip(b: &Box4, height: f64, width: f64) -> Box4 {
    let y = |v: f64| v.max(0.0).min(height);
    let x = |v: f64| v.max(0.0).min(width);
    [y(b[0]), x(b[1]), y(b[2]), x(b[3])]
}
