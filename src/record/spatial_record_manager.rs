use crate::buffer::buffer_manager::BufferManager;
use crate::common::error::Result;
use crate::index::{seek_count, SpatialIndex};
use crate::record::page_chain;
use crate::record::record_id::RecordId;
use crate::storage::page::page::PageId;
use log::debug;
use std::collections::HashSet;

/// I/O footprint of one radius query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchStats {
    /// Page ids the index proposed.
    pub candidate_pages: usize,
    /// Pages fetched, overflow pages included, each counted once.
    pub pages_read: usize,
    /// Seek count over the candidates in ascending order.
    pub seek_count: u64,
}

/// Stores records on the page the spatial index picks for their coordinate
/// and answers radius queries by reading the candidate pages back.
///
/// Results are a superset of the circle: every record on a candidate page
/// comes back, and callers filter by exact distance themselves.
pub struct SpatialRecordManager<'a> {
    buffer_manager: &'a mut BufferManager,
    index: Box<dyn SpatialIndex>,
}

impl<'a> SpatialRecordManager<'a> {
    pub fn new(bpm: &'a mut BufferManager, index: Box<dyn SpatialIndex>) -> SpatialRecordManager<'a> {
        SpatialRecordManager {
            buffer_manager: bpm,
            index,
        }
    }

    pub fn put(&mut self, lat: f64, lng: f64, value: &[u8]) -> Result<RecordId> {
        let home = self.index.to_page_id(lat, lng);
        page_chain::write_chained(self.buffer_manager, home, value, self.index.max_pages())
    }

    pub fn search_radius(&mut self, lat: f64, lng: f64, radius_km: f64) -> Result<Vec<Vec<u8>>> {
        let (records, _) = self.search_radius_with_stats(lat, lng, radius_km)?;
        Ok(records)
    }

    pub fn search_radius_with_stats(
        &mut self,
        lat: f64,
        lng: f64,
        radius_km: f64,
    ) -> Result<(Vec<Vec<u8>>, SearchStats)> {
        let candidates = self.index.get_page_ids(lat, lng, radius_km)?;

        let mut visited: HashSet<PageId> = HashSet::new();
        let mut records = Vec::new();
        let mut pages_read = 0;
        for &pid in &candidates {
            pages_read += page_chain::collect_chain(self.buffer_manager, pid, &mut visited, &mut records)?;
        }

        let mut sorted = candidates.clone();
        sorted.sort_unstable();
        let stats = SearchStats {
            candidate_pages: candidates.len(),
            pages_read,
            seek_count: seek_count(&sorted),
        };
        debug!(
            "{} radius search read {} pages for {} candidates, {} records.",
            self.index.name(),
            stats.pages_read,
            stats.candidate_pages,
            records.len()
        );

        Ok((records, stats))
    }

    pub fn index(&self) -> &dyn SpatialIndex {
        self.index.as_ref()
    }

    pub fn buffer_manager(&mut self) -> &mut BufferManager {
        self.buffer_manager
    }
}
