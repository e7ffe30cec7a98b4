use crate::common::config::BufferConfig;
use crate::common::error::Result;
use crate::storage::disk::disk_manager::DiskManager;
use crate::storage::page::page::{Page, PageId};
use log::{debug, trace, warn};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Page cache sitting between the record managers and the disk manager.
///
/// Every page ever fetched stays resident until `clear_cache`; there is no
/// eviction. A page handed out by `get_page` is the cached instance, so
/// in-place changes are seen by every later fetch of the same id.
pub struct BufferManager {
    page_table: HashMap<PageId, Page>,
    disk_manager: Box<dyn DiskManager>,
    config: BufferConfig,
    disk_reads: u64,
    capacity_warned: bool,
}

impl BufferManager {
    pub fn new(disk_manager: Box<dyn DiskManager>) -> BufferManager {
        BufferManager::with_config(disk_manager, BufferConfig::default())
    }

    pub fn with_config(disk_manager: Box<dyn DiskManager>, config: BufferConfig) -> BufferManager {
        BufferManager {
            page_table: HashMap::new(),
            disk_manager,
            config,
            disk_reads: 0,
            capacity_warned: false,
        }
    }

    /// Returns the cached page, loading it from disk or synthesizing an
    /// empty one on a miss.
    pub fn get_page(&mut self, pid: PageId) -> Result<&mut Page> {
        let cached = self.page_table.len();
        match self.page_table.entry(pid) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                trace!("Cache miss for page {}.", pid);
                self.disk_reads += 1;
                let page = self.disk_manager.read_page(pid)?.unwrap_or_else(|| Page::new(pid));
                warn_over_capacity(&self.config, &mut self.capacity_warned, cached + 1);
                Ok(entry.insert(page))
            }
        }
    }

    pub fn put_page(&mut self, mut page: Page) {
        page.mark_dirty();
        self.page_table.insert(page.get_id(), page);
        warn_over_capacity(&self.config, &mut self.capacity_warned, self.page_table.len());
    }

    /// Writes every dirty page in ascending page id order and returns how
    /// many were written.
    pub fn flush(&mut self) -> Result<usize> {
        let mut dirty: Vec<PageId> = self
            .page_table
            .values()
            .filter(|p| p.is_dirty())
            .map(|p| p.get_id())
            .collect();
        dirty.sort_unstable();

        for pid in &dirty {
            if let Some(page) = self.page_table.get_mut(pid) {
                self.disk_manager.write_page(page)?;
                page.clear_dirty();
            }
        }

        debug!("Flushed {} dirty pages.", dirty.len());
        Ok(dirty.len())
    }

    /// Drops every cached page without writing it back.
    pub fn clear_cache(&mut self) {
        debug!("Dropping {} cached pages.", self.page_table.len());
        self.page_table.clear();
        self.capacity_warned = false;
    }

    pub fn close(&mut self) -> Result<()> {
        self.flush()?;
        self.disk_manager.close()
    }

    pub fn cached_page_count(&self) -> usize {
        self.page_table.len()
    }

    pub fn is_cached(&self, pid: PageId) -> bool {
        self.page_table.contains_key(&pid)
    }

    /// Number of cache misses served by the disk manager so far.
    pub fn disk_reads(&self) -> u64 {
        self.disk_reads
    }
}

fn warn_over_capacity(config: &BufferConfig, warned: &mut bool, cached: usize) {
    if let Some(hint) = config.capacity_hint {
        if !*warned && cached > hint {
            warn!(
                "Buffer holds {} pages, above capacity hint {}; pages are never evicted.",
                cached, hint
            );
            *warned = true;
        }
    }
}
