//! Overflow chains shared by the keyed and the spatial record managers.
//!
//! A home page that fills up links to exactly one overflow page, which may
//! in turn link to another. Overflow pages are taken from the same page
//! space as home pages: the first page below `max_pages` that has never been
//! initialized.

use crate::buffer::buffer_manager::BufferManager;
use crate::common::error::{DbError, Result};
use crate::record::record_id::RecordId;
use crate::storage::page::page::PageId;
use crate::storage::page::page_layout::{self, MAX_RECORD_SIZE};
use log::debug;
use std::collections::HashSet;

/// Writes `value` into the chain starting at `home`, allocating and linking
/// a new overflow page whenever the tail is full.
pub fn write_chained(
    bpm: &mut BufferManager,
    home: PageId,
    value: &[u8],
    max_pages: usize,
) -> Result<RecordId> {
    if value.len() > MAX_RECORD_SIZE {
        return Err(DbError::RecordTooLarge {
            size: value.len(),
            max: MAX_RECORD_SIZE,
        });
    }

    let mut pid = home;
    loop {
        let page = bpm.get_page(pid)?;
        if !page_layout::is_initialized(page) {
            page_layout::initialize_page(page);
        }

        if let Some(slot_id) = page_layout::write_record(page, value) {
            return Ok(RecordId::new(pid, slot_id));
        }

        pid = match page_layout::get_overflow_page_id(page) {
            Some(next) => next,
            None => {
                let next = allocate_new_page(bpm, max_pages)?;
                page_layout::set_overflow_page_id(bpm.get_page(pid)?, Some(next))?;
                debug!("Page {} is full, linked overflow page {}.", pid, next);
                next
            }
        };
    }
}

/// First never-initialized page in `0..max_pages`.
pub fn allocate_new_page(bpm: &mut BufferManager, max_pages: usize) -> Result<PageId> {
    for pid in 0..max_pages {
        if !page_layout::is_initialized(bpm.get_page(pid)?) {
            return Ok(pid);
        }
    }

    Err(DbError::PageSpaceExhausted { max_pages })
}

/// Appends every record of the chain starting at `start` to `out`, skipping
/// pages already in `visited`. Returns the number of pages fetched.
pub fn collect_chain(
    bpm: &mut BufferManager,
    start: PageId,
    visited: &mut HashSet<PageId>,
    out: &mut Vec<Vec<u8>>,
) -> Result<usize> {
    let mut fetched = 0;
    let mut next = Some(start);
    while let Some(pid) = next {
        if !visited.insert(pid) {
            break;
        }

        let page = bpm.get_page(pid)?;
        fetched += 1;
        if !page_layout::is_initialized(page) {
            break;
        }
        out.extend(page_layout::read_all_records(page));
        next = page_layout::get_overflow_page_id(page);
    }

    Ok(fetched)
}

/// Page ids of the chain starting at `start`, home page first.
pub fn chain_page_ids(bpm: &mut BufferManager, start: PageId) -> Result<Vec<PageId>> {
    let mut chain = Vec::new();
    let mut next = Some(start);
    while let Some(pid) = next {
        let page = bpm.get_page(pid)?;
        if !page_layout::is_initialized(page) || chain.contains(&pid) {
            break;
        }
        chain.push(pid);
        next = page_layout::get_overflow_page_id(page);
    }

    Ok(chain)
}
