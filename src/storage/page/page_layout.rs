//! Slotted record layout inside a single page.
//!
//! ```text
//! +--------------+-----------------+-------+----------------+
//! | record count | free space start| magic | overflow page  |  16 byte header
//! +--------------+-----------------+-------+----------------+
//! | slot 0 (offset, len) | slot 1 | ...  ->                 |
//! |                     free space                          |
//! |                  <- ... | record 1 | record 0           |
//! +---------------------------------------------------------+
//! ```
//!
//! All integers are big-endian. A record is a u32 length followed by its
//! bytes. Slots are never reused or compacted, so slot order is insertion
//! order.

use crate::common::error::{DbError, Result};
use crate::storage::page::page::{Page, PageId, PAGE_SIZE};
use log::debug;

pub type SlotId = usize;

pub const OFFSET_RECORD_COUNT: usize = 0;
pub const OFFSET_FREE_SPACE: usize = 4;
pub const OFFSET_MAGIC: usize = 8;
pub const OFFSET_OVERFLOW: usize = 12;
pub const HEADER_SIZE: usize = 16;
pub const SLOT_SIZE: usize = 8;
pub const RECORD_LENGTH_SIZE: usize = 4;
pub const MAGIC: u32 = 0xCAFE_BABE;
pub const NO_OVERFLOW: i32 = -1;

/// Largest payload an empty page can hold.
pub const MAX_RECORD_SIZE: usize = PAGE_SIZE - HEADER_SIZE - SLOT_SIZE - RECORD_LENGTH_SIZE;

// Header fields sit at fixed offsets below HEADER_SIZE.
fn read_header(page: &Page, offset: usize) -> u32 {
    let data = page.get_data();
    u32::from_be_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

/// Reads a u32 at an offset taken from the page itself, which may be
/// corrupt.
fn read_u32(page: &Page, offset: usize) -> Option<u32> {
    let bytes = page.get_data().get(offset..offset.checked_add(4)?)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn write_u32(page: &mut Page, offset: usize, value: u32) {
    page.get_data_mut()[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

pub fn is_initialized(page: &Page) -> bool {
    read_header(page, OFFSET_MAGIC) == MAGIC
}

pub fn initialize_page(page: &mut Page) {
    set_record_count(page, 0);
    set_free_space_start(page, PAGE_SIZE);
    write_u32(page, OFFSET_OVERFLOW, NO_OVERFLOW as u32);
    write_u32(page, OFFSET_MAGIC, MAGIC);
    page.mark_dirty();
    debug!("Initialized page {}.", page.get_id());
}

/// Appends `value` to the record heap.
///
/// Returns `None` when the record and its slot no longer fit between the
/// slot directory and the heap; the caller moves on to an overflow page.
pub fn write_record(page: &mut Page, value: &[u8]) -> Option<SlotId> {
    let record_count = get_record_count(page);
    let free_space_start = get_free_space_start(page);
    let record_size = RECORD_LENGTH_SIZE + value.len();
    let slot_dir_end = HEADER_SIZE + (record_count + 1) * SLOT_SIZE;
    if free_space_start > PAGE_SIZE {
        return None;
    }

    let new_offset = free_space_start.checked_sub(record_size)?;
    if new_offset < slot_dir_end {
        return None;
    }

    write_u32(page, new_offset, value.len() as u32);
    let body = new_offset + RECORD_LENGTH_SIZE;
    page.get_data_mut()[body..body + value.len()].copy_from_slice(value);

    set_slot(page, record_count, new_offset, record_size);
    set_record_count(page, record_count + 1);
    set_free_space_start(page, new_offset);
    page.mark_dirty();

    Some(record_count)
}

pub fn read_record(page: &Page, slot_id: SlotId) -> Option<Vec<u8>> {
    if !is_initialized(page) || slot_id >= get_record_count(page) {
        return None;
    }

    let offset = get_slot_offset(page, slot_id)?;
    let length = read_u32(page, offset)? as usize;
    let body = offset + RECORD_LENGTH_SIZE;
    page.get_data().get(body..body.checked_add(length)?).map(|bytes| bytes.to_vec())
}

pub fn read_all_records(page: &Page) -> Vec<Vec<u8>> {
    if !is_initialized(page) {
        return Vec::new();
    }

    // A corrupt count runs off the slot directory; stop at the first
    // unreadable slot.
    (0..get_record_count(page))
        .map_while(|slot_id| read_record(page, slot_id))
        .collect()
}

pub fn get_overflow_page_id(page: &Page) -> Option<PageId> {
    let raw = read_header(page, OFFSET_OVERFLOW) as i32;
    if raw < 0 {
        None
    } else {
        Some(raw as PageId)
    }
}

/// Links `page` to the next page of its chain, or clears the link.
///
/// The link is a signed 32-bit field, so ids above `i32::MAX` are refused.
pub fn set_overflow_page_id(page: &mut Page, page_id: Option<PageId>) -> Result<()> {
    let raw = match page_id {
        Some(pid) => i32::try_from(pid).map_err(|_| DbError::UnlinkablePage(pid))?,
        None => NO_OVERFLOW,
    };
    write_u32(page, OFFSET_OVERFLOW, raw as u32);
    page.mark_dirty();
    Ok(())
}

pub fn get_record_count(page: &Page) -> usize {
    read_header(page, OFFSET_RECORD_COUNT) as usize
}

/// Bytes left for the next record's payload, after its slot and length
/// prefix are accounted for.
pub fn free_space(page: &Page) -> usize {
    if !is_initialized(page) {
        return MAX_RECORD_SIZE;
    }
    let slot_dir_end = HEADER_SIZE + (get_record_count(page) + 1) * SLOT_SIZE;
    get_free_space_start(page)
        .saturating_sub(slot_dir_end)
        .saturating_sub(RECORD_LENGTH_SIZE)
}

fn set_record_count(page: &mut Page, count: usize) {
    write_u32(page, OFFSET_RECORD_COUNT, count as u32)
}

fn get_free_space_start(page: &Page) -> usize {
    read_header(page, OFFSET_FREE_SPACE) as usize
}

fn set_free_space_start(page: &mut Page, offset: usize) {
    write_u32(page, OFFSET_FREE_SPACE, offset as u32)
}

fn get_slot_offset(page: &Page, slot_id: SlotId) -> Option<usize> {
    let at = slot_id.checked_mul(SLOT_SIZE)?.checked_add(HEADER_SIZE)?;
    read_u32(page, at).map(|offset| offset as usize)
}

fn set_slot(page: &mut Page, slot_id: SlotId, offset: usize, length: usize) {
    let at = HEADER_SIZE + slot_id * SLOT_SIZE;
    write_u32(page, at, offset as u32);
    write_u32(page, at + 4, length as u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn initialized_page(pid: PageId) -> Page {
        let mut page = Page::new(pid);
        initialize_page(&mut page);
        page
    }

    #[test]
    fn should_initialize_header() {
        // given
        let mut page = Page::new(3);
        assert!(!is_initialized(&page));

        // when
        initialize_page(&mut page);

        // then
        assert!(is_initialized(&page));
        assert!(page.is_dirty());
        assert_eq!(get_record_count(&page), 0);
        assert_eq!(get_overflow_page_id(&page), None);
        assert_eq!(&page.get_data()[8..12], &[0xCA, 0xFE, 0xBA, 0xBE]);
        assert_eq!(&page.get_data()[4..8], &(PAGE_SIZE as u32).to_be_bytes());
        assert_eq!(&page.get_data()[12..16], &[0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn should_write_then_read_records_in_slot_order() {
        // given
        let mut page = initialized_page(0);

        // when
        let s0 = write_record(&mut page, b"Alice").unwrap();
        let s1 = write_record(&mut page, b"Bob").unwrap();
        let s2 = write_record(&mut page, b"").unwrap();

        // then
        assert_eq!((s0, s1, s2), (0, 1, 2));
        assert_eq!(read_record(&page, 0).unwrap(), b"Alice");
        assert_eq!(read_record(&page, 1).unwrap(), b"Bob");
        assert_eq!(read_record(&page, 2).unwrap(), b"");
        assert_eq!(
            read_all_records(&page),
            vec![b"Alice".to_vec(), b"Bob".to_vec(), Vec::new()]
        );
    }

    #[test]
    fn should_lay_out_record_at_page_end_with_big_endian_slot() {
        // given
        let mut page = initialized_page(0);

        // when
        write_record(&mut page, b"xyz").unwrap();

        // then
        let data = page.get_data();
        let offset = PAGE_SIZE - 7;
        assert_eq!(&data[16..20], &(offset as u32).to_be_bytes());
        assert_eq!(&data[20..24], &7u32.to_be_bytes());
        assert_eq!(&data[offset..offset + 4], &3u32.to_be_bytes());
        assert_eq!(&data[offset + 4..PAGE_SIZE], b"xyz");
        assert_eq!(&data[4..8], &(offset as u32).to_be_bytes());
    }

    #[test]
    fn should_return_none_when_page_full() {
        // given
        let mut page = initialized_page(0);
        let value = [7u8; 100];
        let mut written = 0;
        while write_record(&mut page, &value).is_some() {
            written += 1;
        }
        let count = get_record_count(&page);

        // when
        let result = write_record(&mut page, &value);

        // then
        assert!(result.is_none());
        assert_eq!(count, written);
        // (4096 - 16) / (8 + 4 + 100)
        assert_eq!(written, 36);
        assert_eq!(get_record_count(&page), count);
        assert!(free_space(&page) < value.len());
    }

    #[test]
    fn should_fit_max_record_exactly_into_empty_page() {
        let mut page = initialized_page(0);
        let value = vec![1u8; MAX_RECORD_SIZE];

        assert_eq!(free_space(&page), MAX_RECORD_SIZE);
        assert_eq!(write_record(&mut page, &value), Some(0));
        assert_eq!(read_record(&page, 0).unwrap(), value);
        assert_eq!(write_record(&mut page, b""), None);
    }

    #[test]
    fn should_reject_record_larger_than_page() {
        let mut page = initialized_page(0);
        assert_eq!(write_record(&mut page, &vec![0u8; PAGE_SIZE]), None);
        assert_eq!(get_record_count(&page), 0);
    }

    #[test]
    fn should_return_none_for_uninitialized_page_or_bad_slot() {
        let page = Page::new(0);
        assert_eq!(read_record(&page, 0), None);
        assert!(read_all_records(&page).is_empty());

        let mut page = initialized_page(0);
        write_record(&mut page, b"only").unwrap();
        assert_eq!(read_record(&page, 1), None);
    }

    #[test]
    fn should_return_empty_records_for_zero_record_page() {
        let page = initialized_page(0);
        assert!(read_all_records(&page).is_empty());
    }

    #[test]
    fn should_set_and_clear_overflow_pointer() {
        // given
        let mut page = initialized_page(0);

        // when
        set_overflow_page_id(&mut page, Some(42)).unwrap();

        // then
        assert_eq!(get_overflow_page_id(&page), Some(42));
        set_overflow_page_id(&mut page, None).unwrap();
        assert_eq!(get_overflow_page_id(&page), None);
    }

    #[test]
    fn should_refuse_overflow_link_beyond_i32() {
        // given
        let mut page = initialized_page(0);
        set_overflow_page_id(&mut page, Some(7)).unwrap();

        // when
        let result = set_overflow_page_id(&mut page, Some(3_000_000_000));

        // then the old link is untouched
        assert!(matches!(result, Err(DbError::UnlinkablePage(3_000_000_000))));
        assert_eq!(get_overflow_page_id(&page), Some(7));
        assert!(set_overflow_page_id(&mut page, Some(i32::MAX as PageId)).is_ok());
        assert_eq!(get_overflow_page_id(&page), Some(i32::MAX as PageId));
    }

    #[test]
    fn should_return_none_for_slot_pointing_past_page_end() {
        // given a slot whose offset was overwritten with garbage
        let mut page = initialized_page(0);
        write_record(&mut page, b"first").unwrap();
        write_record(&mut page, b"second").unwrap();
        write_u32(&mut page, HEADER_SIZE + SLOT_SIZE, 5000);

        // when
        let broken = read_record(&page, 1);

        // then
        assert_eq!(broken, None);
        assert_eq!(read_record(&page, 0).unwrap(), b"first");
        assert_eq!(read_all_records(&page), vec![b"first".to_vec()]);
    }

    #[test]
    fn should_survive_corrupt_record_count_and_free_space() {
        // given
        let mut page = initialized_page(0);
        write_record(&mut page, b"kept").unwrap();
        write_u32(&mut page, OFFSET_RECORD_COUNT, u32::MAX);

        // when
        let far_slot = read_record(&page, 1000);
        let all = read_all_records(&page);

        // then
        assert_eq!(far_slot, None);
        assert_eq!(all[0], b"kept");
        assert!(all.len() < PAGE_SIZE / SLOT_SIZE);

        write_u32(&mut page, OFFSET_RECORD_COUNT, 1);
        write_u32(&mut page, OFFSET_FREE_SPACE, u32::MAX);
        assert_eq!(write_record(&mut page, b"more"), None);
    }

    #[test]
    fn should_return_none_for_record_length_past_page_end() {
        let mut page = initialized_page(0);
        write_record(&mut page, b"abc").unwrap();
        write_u32(&mut page, PAGE_SIZE - 7, u32::MAX);

        assert_eq!(read_record(&page, 0), None);
    }
}
