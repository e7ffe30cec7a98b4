//! GeoHash encoding and Morton-code neighbour arithmetic.
//!
//! A geohash of precision `p` is `5p` bits produced by halving the
//! longitude and latitude ranges alternately, longitude first. The same
//! bits read as an integer form a Morton (Z-order) code whose even bit
//! positions, counted from the most significant end, belong to longitude.

use crate::common::error::{DbError, Result};

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";
const BITS_PER_CHAR: usize = 5;

pub fn encode(lat: f64, lng: f64, precision: usize) -> String {
    let morton = encode_morton(lat, lng, precision);
    (0..precision)
        .map(|i| {
            let shift = BITS_PER_CHAR * (precision - 1 - i);
            BASE32[((morton >> shift) & 0x1f) as usize] as char
        })
        .collect()
}

/// Integer value of `encode(lat, lng, precision)`, computed directly.
pub fn encode_morton(lat: f64, lng: f64, precision: usize) -> u64 {
    let (mut min_lat, mut max_lat) = (-90.0, 90.0);
    let (mut min_lng, mut max_lng) = (-180.0, 180.0);

    let mut bits = 0u64;
    for i in 0..precision * BITS_PER_CHAR {
        let (value, min, max) = if i % 2 == 0 {
            (lng, &mut min_lng, &mut max_lng)
        } else {
            (lat, &mut min_lat, &mut max_lat)
        };

        let mid = (*min + *max) / 2.0;
        if value >= mid {
            bits = (bits << 1) | 1;
            *min = mid;
        } else {
            bits <<= 1;
            *max = mid;
        }
    }
    bits
}

pub fn to_long(geohash: &str) -> Result<u64> {
    geohash.chars().try_fold(0u64, |acc, c| {
        let value = BASE32
            .iter()
            .position(|b| *b as char == c)
            .ok_or(DbError::InvalidGeohash(c))?;
        Ok((acc << BITS_PER_CHAR) | value as u64)
    })
}

/// Bits owned by (longitude, latitude); longitude gets the odd one out.
fn axis_bits(precision: usize) -> (u32, u32) {
    let total = (precision * BITS_PER_CHAR) as u32;
    ((total + 1) / 2, total / 2)
}

fn deinterleave(morton: u64, precision: usize) -> (u64, u64) {
    let total = precision * BITS_PER_CHAR;
    let (mut lng, mut lat) = (0u64, 0u64);
    for k in 0..total {
        let bit = (morton >> (total - 1 - k)) & 1;
        if k % 2 == 0 {
            lng = (lng << 1) | bit;
        } else {
            lat = (lat << 1) | bit;
        }
    }
    (lng, lat)
}

/// Column and row `(lng, lat)` of a cell on its precision's grid.
pub fn grid_position(morton: u64, precision: usize) -> (u64, u64) {
    deinterleave(morton, precision)
}

/// Number of columns and rows at `precision`.
pub fn grid_dimensions(precision: usize) -> (u64, u64) {
    let (lng_bits, lat_bits) = axis_bits(precision);
    (1u64 << lng_bits, 1u64 << lat_bits)
}

fn interleave(lng: u64, lat: u64, precision: usize) -> u64 {
    let total = precision * BITS_PER_CHAR;
    let (lng_bits, lat_bits) = axis_bits(precision);
    let mut morton = 0u64;
    for k in 0..total {
        let bit = if k % 2 == 0 {
            (lng >> (lng_bits as usize - 1 - k / 2)) & 1
        } else {
            (lat >> (lat_bits as usize - 1 - k / 2)) & 1
        };
        morton = (morton << 1) | bit;
    }
    morton
}

/// The cell `d_lat` rows and `d_lng` columns away, or `None` past the edge
/// of the grid.
pub fn neighbor(morton: u64, d_lat: i64, d_lng: i64, precision: usize) -> Option<u64> {
    let (lng_bits, lat_bits) = axis_bits(precision);
    let (lng, lat) = deinterleave(morton, precision);

    let lng = lng as i64 + d_lng;
    let lat = lat as i64 + d_lat;
    if lng < 0 || lng >= 1i64 << lng_bits || lat < 0 || lat >= 1i64 << lat_bits {
        return None;
    }

    Some(interleave(lng as u64, lat as u64, precision))
}

/// The cell followed by whichever of its eight neighbours exist.
pub fn neighbors(morton: u64, precision: usize) -> Vec<u64> {
    const DIRECTIONS: [(i64, i64); 8] = [
        (1, 0),
        (-1, 0),
        (0, 1),
        (0, -1),
        (1, 1),
        (1, -1),
        (-1, 1),
        (-1, -1),
    ];

    let mut cells = vec![morton];
    cells.extend(
        DIRECTIONS
            .iter()
            .filter_map(|(d_lat, d_lng)| neighbor(morton, *d_lat, *d_lng, precision)),
    );
    cells
}
