//! Numeric helpers for axis layout.

use std::f64::consts::PI;

/// Largest bound tried by [`choose_tick_granularity`].
const STARTING_DELTA_BOUND: f64 = 1e10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Tick step for a data range of `delta`.
///
/// Walks down the powers of ten from 10^10 to 10^0 and returns a tenth of the
/// first one `delta` exceeds, so `1234` gives `100`.
///
/// 10^0 is the lowest bound tried: a `delta` of 1 or less gives zero instead of
/// a fractional step. Star counts are whole numbers, and [`nice_ticks`] raises a
/// zero step to its `min_step`.
pub fn choose_tick_granularity(delta: f64) -> f64 {
    let mut bound = STARTING_DELTA_BOUND;
    while bound >= 1.0 {
        if delta > bound {
            return bound / 10.0;
        }
        bound /= 10.0;
    }
    0.0
}

/// Rounds `value` up to a multiple of `step`. A non-positive step leaves it as is.
pub fn snap_up(value: f64, step: f64) -> f64 {
    if step <= 0.0 || !step.is_finite() {
        return value;
    }
    (value / step).ceil() * step
}

/// Rounds `value` down to a multiple of `step`. A non-positive step leaves it as is.
pub fn snap_down(value: f64, step: f64) -> f64 {
    if step <= 0.0 || !step.is_finite() {
        return value;
    }
    (value / step).floor() * step
}

/// Rotates `point` around `pivot` by `theta` radians.
pub fn rotate_point(pivot: Point, point: Point, theta: f64) -> Point {
    let dx = point.x - pivot.x;
    let dy = point.y - pivot.y;
    let (sin, cos) = theta.sin_cos();
    Point {
        x: dx * cos - dy * sin + pivot.x,
        y: dx * sin + dy * cos + pivot.y,
    }
}

pub fn degrees_to_radians(degrees: f64) -> f64 {
    degrees * (PI / 180.0)
}

/// Font size in pixels for a size in points at `dpi`.
pub fn points_to_pixels(dpi: f64, points: f64) -> f64 {
    points * dpi / 72.0
}

/// Evenly spaced tick values covering `[min, max]`.
///
/// Starts from [`choose_tick_granularity`] and widens the step through the
/// 1-2-5 sequence until at most `max_ticks` values are needed. The first tick
/// is at or below `min` and the last at or above `max`. Steps below `min_step`
/// are never used.
pub fn nice_ticks(min: f64, max: f64, max_ticks: usize, min_step: f64) -> Vec<f64> {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    let max_ticks = max_ticks.max(3);

    let base = choose_tick_granularity(max - min).max(min_step);
    if base <= 0.0 {
        return if min == max { vec![min] } else { vec![min, max] };
    }

    let mut scale = 1.0;
    for _ in 0..32 {
        for factor in [1.0, 2.0, 5.0] {
            let step = base * scale * factor;
            if step < min_step {
                continue;
            }
            let low = snap_down(min, step);
            let high = snap_up(max, step);
            let count = ((high - low) / step).round() as usize + 1;
            if count <= max_ticks {
                return (0..count).map(|i| low + i as f64 * step).collect();
            }
        }
        scale *= 10.0;
    }
    vec![min, max]
}
