//! Tunables for the record managers and the two spatial indexes.
//!
//! The defaults reproduce the reference deployment: a page file of 1000
//! hashed pages, 10000 spatial pages, and a Hilbert grid laid over the
//! Korean peninsula. The Hilbert km-per-grid constants are calibrated for
//! that bounding box only and must be recalibrated for any other region.

use crate::common::error::{DbError, Result};
use serde::{Deserialize, Serialize};

/// Overflow links are stored as signed 32-bit page ids on disk.
pub const MAX_PAGES: usize = i32::MAX as usize;

fn validate_max_pages(max_pages: usize) -> Result<()> {
    if max_pages == 0 {
        return Err(DbError::InvalidConfig("max_pages must be positive".to_string()));
    }
    if max_pages > MAX_PAGES {
        return Err(DbError::InvalidConfig(format!(
            "max_pages must be at most {}, got {}",
            MAX_PAGES, max_pages
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Soft bound on cached pages. Nothing is evicted when it is exceeded,
    /// the cache only reports it once.
    pub capacity_hint: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordConfig {
    pub max_pages: usize,
}

impl Default for RecordConfig {
    fn default() -> Self {
        RecordConfig { max_pages: 1000 }
    }
}

impl RecordConfig {
    pub fn validate(&self) -> Result<()> {
        validate_max_pages(self.max_pages)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoHashConfig {
    /// Number of base-32 characters, 5 bits each.
    pub precision: usize,
    pub max_pages: usize,
    /// Approximate edge length of one cell, used to turn a radius into a
    /// neighbour step count.
    pub cell_size_km: f64,
}

impl Default for GeoHashConfig {
    fn default() -> Self {
        GeoHashConfig {
            precision: 6,
            max_pages: 10000,
            cell_size_km: 1.2,
        }
    }
}

pub const MAX_GEOHASH_PRECISION: usize = 12;

impl GeoHashConfig {
    pub fn validate(&self) -> Result<()> {
        if self.precision == 0 || self.precision > MAX_GEOHASH_PRECISION {
            return Err(DbError::InvalidConfig(format!(
                "geohash precision must be within 1..={}, got {}",
                MAX_GEOHASH_PRECISION, self.precision
            )));
        }
        validate_max_pages(self.max_pages)?;
        if !(self.cell_size_km > 0.0) {
            return Err(DbError::InvalidConfig("cell_size_km must be positive".to_string()));
        }
        Ok(())
    }
}

/// Geographic rectangle the Hilbert grid is stretched over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Default for GeoBounds {
    fn default() -> Self {
        GeoBounds {
            min_lat: 33.0,
            max_lat: 38.5,
            min_lng: 126.0,
            max_lng: 129.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HilbertConfig {
    /// Bits per axis; the grid is 2^order cells wide.
    pub order: u32,
    pub max_pages: usize,
    pub bounds: GeoBounds,
    pub km_per_grid_lat: f64,
    pub km_per_grid_lng: f64,
}

impl Default for HilbertConfig {
    fn default() -> Self {
        HilbertConfig {
            order: 15,
            max_pages: 10000,
            bounds: GeoBounds::default(),
            km_per_grid_lat: 0.0185,
            km_per_grid_lng: 0.0095,
        }
    }
}

pub const MAX_HILBERT_ORDER: u32 = 31;

impl HilbertConfig {
    pub fn grid_size(&self) -> u64 {
        1u64 << self.order
    }

    pub fn validate(&self) -> Result<()> {
        if self.order == 0 || self.order > MAX_HILBERT_ORDER {
            return Err(DbError::InvalidConfig(format!(
                "hilbert order must be within 1..={}, got {}",
                MAX_HILBERT_ORDER, self.order
            )));
        }
        validate_max_pages(self.max_pages)?;
        let n = self.grid_size();
        if n * n < self.max_pages as u64 {
            return Err(DbError::InvalidConfig(format!(
                "{} pages cannot be spread over {} curve values",
                self.max_pages,
                n * n
            )));
        }
        let b = &self.bounds;
        if !(b.max_lat > b.min_lat) || !(b.max_lng > b.min_lng) {
            return Err(DbError::InvalidConfig("bounding box is empty".to_string()));
        }
        if !(self.km_per_grid_lat > 0.0) || !(self.km_per_grid_lng > 0.0) {
            return Err(DbError::InvalidConfig("km per grid unit must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accept_default_configs() {
        assert!(RecordConfig::default().validate().is_ok());
        assert!(GeoHashConfig::default().validate().is_ok());
        assert!(HilbertConfig::default().validate().is_ok());
    }

    #[test]
    fn should_reject_geohash_precision_beyond_u64() {
        // given
        let config = GeoHashConfig {
            precision: 13,
            ..GeoHashConfig::default()
        };

        // when
        let result = config.validate();

        // then
        assert!(matches!(result, Err(DbError::InvalidConfig(_))));
    }

    #[test]
    fn should_reject_more_pages_than_curve_values() {
        let config = HilbertConfig {
            order: 2,
            max_pages: 17,
            ..HilbertConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_inverted_bounds() {
        let config = HilbertConfig {
            bounds: GeoBounds {
                min_lat: 40.0,
                max_lat: 30.0,
                ..GeoBounds::default()
            },
            ..HilbertConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_page_counts_an_overflow_link_cannot_hold() {
        // given
        let too_many = MAX_PAGES + 1;

        // when
        let record = RecordConfig { max_pages: too_many }.validate();
        let geohash = GeoHashConfig {
            max_pages: too_many,
            ..GeoHashConfig::default()
        }
        .validate();
        let hilbert = HilbertConfig {
            max_pages: too_many,
            ..HilbertConfig::default()
        }
        .validate();

        // then
        assert!(matches!(record, Err(DbError::InvalidConfig(_))));
        assert!(matches!(geohash, Err(DbError::InvalidConfig(_))));
        assert!(matches!(hilbert, Err(DbError::InvalidConfig(_))));
        assert!(RecordConfig { max_pages: MAX_PAGES }.validate().is_ok());
    }

    #[test]
    fn should_round_trip_configs_through_bincode() {
        // given
        let hilbert = HilbertConfig {
            order: 12,
            max_pages: 4096,
            bounds: GeoBounds {
                min_lat: 35.0,
                max_lat: 36.0,
                min_lng: 128.0,
                max_lng: 130.0,
            },
            ..HilbertConfig::default()
        };
        let buffer = BufferConfig { capacity_hint: Some(64) };

        // when
        let hilbert_back: HilbertConfig = bincode::deserialize(&bincode::serialize(&hilbert).unwrap()).unwrap();
        let buffer_back: BufferConfig = bincode::deserialize(&bincode::serialize(&buffer).unwrap()).unwrap();

        // then
        assert_eq!(hilbert_back, hilbert);
        assert_eq!(buffer_back, buffer);
    }
}
