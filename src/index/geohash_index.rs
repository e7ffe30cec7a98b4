use crate::common::config::GeoHashConfig;
use crate::common::error::Result;
use crate::index::geohash;
use crate::index::{checked_radius, SpatialIndex};
use crate::storage::page::page::PageId;
use std::collections::HashSet;

/// Z-order placement: a cell's Morton code modulo the page count.
///
/// Cells that are adjacent on the ground can sit far apart on the Z curve,
/// and the modulus scatters them further, so a radius query touches many
/// unrelated pages.
pub struct GeoHashIndex {
    config: GeoHashConfig,
}

impl GeoHashIndex {
    pub fn new() -> GeoHashIndex {
        GeoHashIndex {
            config: GeoHashConfig::default(),
        }
    }

    pub fn with_config(config: GeoHashConfig) -> Result<GeoHashIndex> {
        config.validate()?;
        Ok(GeoHashIndex { config })
    }

    pub fn cell(&self, lat: f64, lng: f64) -> u64 {
        geohash::encode_morton(lat, lng, self.config.precision)
    }

    fn page_of_cell(&self, cell: u64) -> PageId {
        (cell % self.config.max_pages as u64) as PageId
    }

    fn steps(&self, radius_km: f64) -> i64 {
        ((radius_km / self.config.cell_size_km).ceil() as i64).saturating_add(1)
    }
}

/// Offsets `(lo, hi)` from `pos` that stay on an axis of `len` cells and
/// within `steps` of it.
fn reach(pos: u64, len: u64, steps: i64) -> (i64, i64) {
    let before = (pos as i64).min(steps);
    let after = ((len - 1 - pos) as i64).min(steps);
    (-before, after)
}

impl Default for GeoHashIndex {
    fn default() -> Self {
        GeoHashIndex::new()
    }
}

impl SpatialIndex for GeoHashIndex {
    fn to_page_id(&self, lat: f64, lng: f64) -> PageId {
        self.page_of_cell(self.cell(lat, lng))
    }

    /// Scans the `(2 * steps + 1)` square of cells south-west first and keeps
    /// each page the first time it appears. Rows and columns past the edge of
    /// the grid are skipped, and the scan stops once every page is listed.
    fn get_page_ids(&self, lat: f64, lng: f64, radius_km: f64) -> Result<Vec<PageId>> {
        let radius_km = checked_radius(radius_km)?;
        let precision = self.config.precision;
        let center = self.cell(lat, lng);
        let steps = self.steps(radius_km);

        let (col, row) = geohash::grid_position(center, precision);
        let (cols, rows) = geohash::grid_dimensions(precision);
        let lat_span = reach(row, rows, steps);
        let lng_span = reach(col, cols, steps);

        let mut seen: HashSet<PageId> = HashSet::new();
        let mut page_ids: Vec<PageId> = Vec::new();
        'scan: for d_lat in lat_span.0..=lat_span.1 {
            for d_lng in lng_span.0..=lng_span.1 {
                let cell = match geohash::neighbor(center, d_lat, d_lng, precision) {
                    Some(cell) => cell,
                    None => continue,
                };
                let pid = self.page_of_cell(cell);
                if seen.insert(pid) {
                    page_ids.push(pid);
                    if page_ids.len() == self.config.max_pages {
                        break 'scan;
                    }
                }
            }
        }
        Ok(page_ids)
    }

    fn max_pages(&self) -> usize {
        self.config.max_pages
    }

    fn name(&self) -> &'static str {
        "geohash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::DbError;
    use crate::index::seek_count;

    const GANGNAM: (f64, f64) = (37.4979, 127.0276);

    #[test]
    fn should_map_cell_to_page_by_modulus() {
        let index = GeoHashIndex::new();

        let pid = index.to_page_id(GANGNAM.0, GANGNAM.1);

        assert_eq!(pid, (971_394_252u64 % 10000) as PageId);
    }

    #[test]
    fn should_cover_search_square_for_five_km() {
        // given
        let index = GeoHashIndex::new();

        // when
        let mut page_ids = index.get_page_ids(GANGNAM.0, GANGNAM.1, 5.0).unwrap();

        // then, 6 steps each way -> 13 x 13 cells, one page each
        assert_eq!(page_ids.len(), 169);
        assert!(page_ids.contains(&index.to_page_id(GANGNAM.0, GANGNAM.1)));
        page_ids.sort_unstable();
        assert_eq!(seek_count(&page_ids), 720);
    }

    #[test]
    fn should_cover_search_square_for_one_km() {
        let index = GeoHashIndex::new();

        let mut page_ids = index.get_page_ids(GANGNAM.0, GANGNAM.1, 1.0).unwrap();

        assert_eq!(page_ids.len(), 25);
        page_ids.sort_unstable();
        assert_eq!(seek_count(&page_ids), 48);
    }

    #[test]
    fn should_start_scan_at_south_west_corner() {
        let index = GeoHashIndex::new();
        let center = index.cell(GANGNAM.0, GANGNAM.1);

        let page_ids = index.get_page_ids(GANGNAM.0, GANGNAM.1, 0.0).unwrap();

        let corner = geohash::neighbor(center, -1, -1, 6).unwrap();
        assert_eq!(page_ids.len(), 9);
        assert_eq!(page_ids[0], (corner % 10000) as PageId);
    }

    #[test]
    fn should_keep_page_ids_within_page_space() {
        let index = GeoHashIndex::with_config(GeoHashConfig {
            max_pages: 7,
            ..GeoHashConfig::default()
        })
        .unwrap();

        let page_ids = index.get_page_ids(GANGNAM.0, GANGNAM.1, 3.0).unwrap();

        assert!(page_ids.iter().all(|pid| *pid < 7));
        assert!(page_ids.len() <= 7);
        let mut unique = page_ids.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), page_ids.len());
    }

    #[test]
    fn should_drop_cells_beyond_the_pole() {
        let index = GeoHashIndex::new();

        let page_ids = index.get_page_ids(89.999, 0.0, 0.0).unwrap();

        // the row north of the top row does not exist
        assert_eq!(page_ids.len(), 6);
    }

    #[test]
    fn should_reject_zero_precision() {
        let result = GeoHashIndex::with_config(GeoHashConfig {
            precision: 0,
            ..GeoHashConfig::default()
        });

        assert!(matches!(result, Err(DbError::InvalidConfig(_))));
    }

    #[test]
    fn should_reject_an_infinite_radius() {
        let index = GeoHashIndex::new();

        let result = index.get_page_ids(GANGNAM.0, GANGNAM.1, f64::INFINITY);

        assert!(matches!(result, Err(DbError::InvalidRadius(_))));
        assert!(index.get_page_ids(GANGNAM.0, GANGNAM.1, f64::NAN).is_err());
    }

    #[test]
    fn should_return_every_page_for_a_radius_wider_than_the_globe() {
        // given
        let index = GeoHashIndex::new();

        // when
        let page_ids = index.get_page_ids(GANGNAM.0, GANGNAM.1, 1.0e12).unwrap();

        // then
        let mut sorted = page_ids.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..10_000).collect::<Vec<PageId>>());
    }

    #[test]
    fn should_clip_the_scan_at_the_grid_corner() {
        // given the south-west corner cell, 15 bits per axis at precision 6
        let index = GeoHashIndex::new();

        // when
        let page_ids = index.get_page_ids(-90.0, -180.0, 1.0).unwrap();

        // then 3 x 3 cells remain of the 5 x 5 square
        let cells: Vec<PageId> = [(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2), (2, 0), (2, 1), (2, 2)]
            .iter()
            .map(|(d_lat, d_lng)| index.page_of_cell(geohash::neighbor(0, *d_lat, *d_lng, 6).unwrap()))
            .collect();
        assert_eq!(page_ids, cells);
    }
}
