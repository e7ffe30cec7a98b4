use crate::buffer::buffer_manager::BufferManager;
use crate::common::config::RecordConfig;
use crate::common::error::Result;
use crate::common::hash::hash;
use crate::record::page_chain;
use crate::record::record_id::RecordId;
use crate::storage::page::page::PageId;
use crate::storage::page::page_layout;
use log::debug;
use std::collections::HashMap;

/// Key/value store over hashed pages.
///
/// A key lives on page `hash(key) % max_pages` or somewhere down that page's
/// overflow chain. The primary index remembers exactly where, so `get` never
/// scans. The index lives in memory and is not rebuilt from the page file.
/// `export_index` and `import_index` carry it across a restart.
pub struct RecordManager<'a> {
    buffer_manager: &'a mut BufferManager,
    config: RecordConfig,
    primary_index: HashMap<Vec<u8>, RecordId>,
}

impl<'a> RecordManager<'a> {
    pub fn new(bpm: &'a mut BufferManager) -> RecordManager<'a> {
        RecordManager {
            buffer_manager: bpm,
            config: RecordConfig::default(),
            primary_index: HashMap::new(),
        }
    }

    pub fn with_config(bpm: &'a mut BufferManager, config: RecordConfig) -> Result<RecordManager<'a>> {
        config.validate()?;
        Ok(RecordManager {
            buffer_manager: bpm,
            config,
            primary_index: HashMap::new(),
        })
    }

    pub fn page_id_of(&self, key: &[u8]) -> PageId {
        (hash(key) % self.config.max_pages as u64) as PageId
    }

    /// Stores `value` under `key`. A second put of the same key appends a
    /// new record and repoints the index; the old bytes stay on the page.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<RecordId> {
        let home = self.page_id_of(key);
        let rid = page_chain::write_chained(self.buffer_manager, home, value, self.config.max_pages)?;
        self.primary_index.insert(key.to_vec(), rid);
        Ok(rid)
    }

    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let rid = match self.primary_index.get(key) {
            Some(rid) => *rid,
            None => return Ok(None),
        };

        let page = self.buffer_manager.get_page(rid.get_page_id())?;
        Ok(page_layout::read_record(page, rid.get_slot_id()))
    }

    /// Current value of every key, in index iteration order.
    pub fn get_all_values(&mut self) -> Result<Vec<Vec<u8>>> {
        let rids: Vec<RecordId> = self.primary_index.values().copied().collect();
        let mut values = Vec::with_capacity(rids.len());
        for rid in rids {
            let page = self.buffer_manager.get_page(rid.get_page_id())?;
            if let Some(value) = page_layout::read_record(page, rid.get_slot_id()) {
                values.push(value);
            }
        }
        Ok(values)
    }

    pub fn locate(&self, key: &[u8]) -> Option<RecordId> {
        self.primary_index.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.primary_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary_index.is_empty()
    }

    /// Snapshot of the primary index as bincode bytes.
    pub fn export_index(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.primary_index)?)
    }

    /// Replaces the primary index with a snapshot taken by `export_index`.
    pub fn import_index(&mut self, bytes: &[u8]) -> Result<()> {
        let index: HashMap<Vec<u8>, RecordId> = bincode::deserialize(bytes)?;
        debug!("Imported primary index with {} keys.", index.len());
        self.primary_index = index;
        Ok(())
    }

    pub fn buffer_manager(&mut self) -> &mut BufferManager {
        self.buffer_manager
    }
}
