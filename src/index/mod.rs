//! Spatial indexes mapping coordinates onto pages of the page file.
//!
//! Both variants linearize a 2D grid into integers and cut that line into
//! pages. They differ in how well nearby cells stay on nearby pages, which
//! is what `seek_count` measures.

pub mod geohash;
pub mod geohash_index;
pub mod hilbert;
pub mod hilbert_index;

use crate::common::config::{GeoHashConfig, HilbertConfig};
use crate::common::error::{DbError, Result};
use crate::storage::page::page::PageId;
use geohash_index::GeoHashIndex;
use hilbert_index::HilbertIndex;
use serde::{Deserialize, Serialize};

pub trait SpatialIndex {
    /// Page holding records at this coordinate.
    fn to_page_id(&self, lat: f64, lng: f64) -> PageId;

    /// Candidate pages for a radius query. Always contains
    /// `to_page_id(lat, lng)`; may hold pages outside the circle. A
    /// non-finite radius is rejected with `DbError::InvalidRadius`.
    fn get_page_ids(&self, lat: f64, lng: f64, radius_km: f64) -> Result<Vec<PageId>>;

    /// Size of the page space every id above falls in.
    fn max_pages(&self) -> usize;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpatialIndexKind {
    GeoHash(GeoHashConfig),
    Hilbert(HilbertConfig),
}

pub fn build(kind: SpatialIndexKind) -> Result<Box<dyn SpatialIndex>> {
    Ok(match kind {
        SpatialIndexKind::GeoHash(config) => Box::new(GeoHashIndex::with_config(config)?),
        SpatialIndexKind::Hilbert(config) => Box::new(HilbertIndex::with_config(config)?),
    })
}

/// Radius in kilometres usable for step counting; negative radii search
/// the centre cell's neighbourhood only.
pub fn checked_radius(radius_km: f64) -> Result<f64> {
    if !radius_km.is_finite() {
        return Err(DbError::InvalidRadius(radius_km));
    }
    Ok(radius_km.max(0.0))
}

/// Sum of the jumps between consecutive page ids, a proxy for disk head
/// travel. Callers pass the ids in the order they will be read.
pub fn seek_count(page_ids: &[PageId]) -> u64 {
    page_ids
        .windows(2)
        .map(|pair| (pair[1] as i64 - pair[0] as i64).unsigned_abs())
        .sum()
}

/// Maximal runs of consecutive ids in a sorted, deduplicated list.
pub fn page_intervals(sorted_page_ids: &[PageId]) -> Vec<(PageId, PageId)> {
    let mut intervals: Vec<(PageId, PageId)> = Vec::new();
    for &pid in sorted_page_ids {
        match intervals.last_mut() {
            Some((_, end)) if *end + 1 == pid => *end = pid,
            _ => intervals.push((pid, pid)),
        }
    }
    intervals
}
