//! Hilbert curve over a quantized latitude/longitude grid.
//!
//! Longitude is the x axis and latitude the y axis. Consecutive curve values
//! always name edge-adjacent cells, which is what lets the Hilbert index cut
//! the curve into pages without scattering neighbours.

use crate::common::config::HilbertConfig;

/// Maps `value` linearly from `[min, max]` onto `[0, 2^order - 1]`,
/// clamping anything outside the range to the nearest edge.
pub fn to_grid(value: f64, min: f64, max: f64, order: u32) -> u64 {
    let n = 1u64 << order;
    let ratio = ((value - min) / (max - min)).clamp(0.0, 1.0);
    (ratio * (n - 1) as f64) as u64
}

/// Grid cell `(x, y)` of a coordinate.
pub fn grid_cell(lat: f64, lng: f64, config: &HilbertConfig) -> (u64, u64) {
    let b = &config.bounds;
    (
        to_grid(lng, b.min_lng, b.max_lng, config.order),
        to_grid(lat, b.min_lat, b.max_lat, config.order),
    )
}

pub fn encode(lat: f64, lng: f64, config: &HilbertConfig) -> u64 {
    let (x, y) = grid_cell(lat, lng, config);
    xy2d(config.grid_size(), x, y)
}

/// Distance along the curve of cell `(x, y)` on an `n`-by-`n` grid.
pub fn xy2d(n: u64, x: u64, y: u64) -> u64 {
    let (mut x, mut y) = (x, y);
    let mut d = 0u64;
    let mut s = n / 2;

    while s > 0 {
        let rx = ((x & s) > 0) as u64;
        let ry = ((y & s) > 0) as u64;
        d += s * s * ((3 * rx) ^ ry);
        rotate(s, &mut x, &mut y, rx, ry);
        s /= 2;
    }

    d
}

/// Inverse of `xy2d`.
pub fn d2xy(n: u64, d: u64) -> (u64, u64) {
    let (mut x, mut y) = (0u64, 0u64);
    let mut t = d;
    let mut s = 1u64;

    while s < n {
        let rx = 1 & (t / 2);
        let ry = 1 & (t ^ rx);
        rotate(s, &mut x, &mut y, rx, ry);
        x += s * rx;
        y += s * ry;
        t /= 4;
        s *= 2;
    }

    (x, y)
}

// Bits above `s` may wrap; only the bits below `s` are read afterwards.
fn rotate(s: u64, x: &mut u64, y: &mut u64, rx: u64, ry: u64) {
    if ry == 0 {
        if rx == 1 {
            *x = s.wrapping_sub(1).wrapping_sub(*x);
            *y = s.wrapping_sub(1).wrapping_sub(*y);
        }
        std::mem::swap(x, y);
    }
}
