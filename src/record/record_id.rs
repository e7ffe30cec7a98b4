use crate::storage::page::page::PageId;
use crate::storage::page::page_layout::SlotId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical location of a record: a page and a slot within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId {
    page_id: PageId,
    slot_id: SlotId,
}

impl RecordId {
    pub fn new(page_id: PageId, slot_id: SlotId) -> RecordId {
        RecordId { page_id, slot_id }
    }

    pub fn get_page_id(&self) -> PageId {
        self.page_id
    }

    pub fn get_slot_id(&self) -> SlotId {
        self.slot_id
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId{{page_id={}, slot_id={}}}", self.page_id, self.slot_id)
    }
}
