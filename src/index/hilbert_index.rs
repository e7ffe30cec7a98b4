use crate::common::config::HilbertConfig;
use crate::common::error::Result;
use crate::index::hilbert;
use crate::index::{checked_radius, SpatialIndex};
use crate::storage::page::page::PageId;

/// Hilbert placement: the curve is cut into `max_pages` equal, contiguous
/// ranges and each range is one page.
///
/// Division keeps adjacent curve values on the same or the next page. A
/// radius query still decomposes into several disjoint curve intervals, so
/// `get_page_ids` collects the pages of every grid cell in the query
/// rectangle rather than guessing a single value range.
pub struct HilbertIndex {
    config: HilbertConfig,
    range_per_page: u64,
}

impl HilbertIndex {
    pub fn new() -> HilbertIndex {
        let config = HilbertConfig::default();
        let range_per_page = range_per_page(&config);
        HilbertIndex {
            config,
            range_per_page,
        }
    }

    pub fn with_config(config: HilbertConfig) -> Result<HilbertIndex> {
        config.validate()?;
        let range_per_page = range_per_page(&config);
        Ok(HilbertIndex {
            config,
            range_per_page,
        })
    }

    pub fn range_per_page(&self) -> u64 {
        self.range_per_page
    }

    pub fn curve_value(&self, lat: f64, lng: f64) -> u64 {
        hilbert::encode(lat, lng, &self.config)
    }

    pub fn grid_cell(&self, lat: f64, lng: f64) -> (u64, u64) {
        hilbert::grid_cell(lat, lng, &self.config)
    }

    pub fn page_of_value(&self, value: u64) -> PageId {
        let pid = (value / self.range_per_page) as PageId;
        pid.min(self.config.max_pages - 1)
    }

    fn steps(radius_km: f64, km_per_grid: f64) -> u64 {
        (radius_km / km_per_grid).ceil() as u64
    }

    /// Marks the page of every cell of `rect` that lies in the aligned block
    /// at `(x, y)` with edge `size`. An aligned block is one contiguous run
    /// of `size * size` curve values, so a block wholly inside `rect` is
    /// marked as a range without visiting its cells.
    fn mark_block(&self, rect: &CellRect, x: u64, y: u64, size: u64, marked: &mut [bool]) {
        if !rect.intersects(x, y, size) {
            return;
        }

        if rect.contains(x, y, size) {
            let area = size * size;
            let first = hilbert::xy2d(self.config.grid_size(), x, y) / area * area;
            let lo = self.page_of_value(first);
            let hi = self.page_of_value(first + area - 1);
            marked[lo..=hi].fill(true);
            return;
        }

        let half = size / 2;
        for (dx, dy) in [(0, 0), (0, half), (half, 0), (half, half)] {
            self.mark_block(rect, x + dx, y + dy, half, marked);
        }
    }
}

/// Inclusive rectangle of grid cells.
struct CellRect {
    x0: u64,
    x1: u64,
    y0: u64,
    y1: u64,
}

impl CellRect {
    fn around(center: (u64, u64), steps: (u64, u64), n: u64) -> CellRect {
        CellRect {
            x0: center.0.saturating_sub(steps.0),
            x1: center.0.saturating_add(steps.0).min(n - 1),
            y0: center.1.saturating_sub(steps.1),
            y1: center.1.saturating_add(steps.1).min(n - 1),
        }
    }

    fn intersects(&self, x: u64, y: u64, size: u64) -> bool {
        x <= self.x1 && x + size - 1 >= self.x0 && y <= self.y1 && y + size - 1 >= self.y0
    }

    fn contains(&self, x: u64, y: u64, size: u64) -> bool {
        x >= self.x0 && x + size - 1 <= self.x1 && y >= self.y0 && y + size - 1 <= self.y1
    }
}

fn range_per_page(config: &HilbertConfig) -> u64 {
    let n = config.grid_size();
    n * n / config.max_pages as u64
}

impl Default for HilbertIndex {
    fn default() -> Self {
        HilbertIndex::new()
    }
}

impl SpatialIndex for HilbertIndex {
    fn to_page_id(&self, lat: f64, lng: f64) -> PageId {
        self.page_of_value(self.curve_value(lat, lng))
    }

    fn get_page_ids(&self, lat: f64, lng: f64, radius_km: f64) -> Result<Vec<PageId>> {
        let radius_km = checked_radius(radius_km)?;
        let n = self.config.grid_size();
        let steps = (
            Self::steps(radius_km, self.config.km_per_grid_lng),
            Self::steps(radius_km, self.config.km_per_grid_lat),
        );
        let rect = CellRect::around(self.grid_cell(lat, lng), steps, n);

        let mut marked = vec![false; self.config.max_pages];
        self.mark_block(&rect, 0, 0, n, &mut marked);

        Ok(marked
            .iter()
            .enumerate()
            .filter(|(_, hit)| **hit)
            .map(|(pid, _)| pid)
            .collect())
    }

    fn max_pages(&self) -> usize {
        self.config.max_pages
    }

    fn name(&self) -> &'static str {
        "hilbert"
    }
}
