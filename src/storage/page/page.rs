pub type PageId = usize;
pub const PAGE_SIZE: usize = 4096;

/// A fixed-size block of the page file together with its identity.
#[derive(Clone)]
pub struct Page {
    id: PageId,
    dirty_flag: bool,
    data: [u8; PAGE_SIZE],
}

impl Page {
    pub fn new(page_id: PageId) -> Page {
        Page {
            id: page_id,
            dirty_flag: false,
            data: [0; PAGE_SIZE],
        }
    }

    pub fn from_bytes(page_id: PageId, bytes: [u8; PAGE_SIZE]) -> Page {
        Page {
            id: page_id,
            dirty_flag: false,
            data: bytes,
        }
    }

    pub fn get_id(&self) -> PageId {
        self.id
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_flag
    }

    pub fn mark_dirty(&mut self) {
        self.dirty_flag = true
    }

    pub fn clear_dirty(&mut self) {
        self.dirty_flag = false
    }

    pub fn get_data(&self) -> &[u8; PAGE_SIZE] {
        &self.data
    }

    pub fn get_data_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.data
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("dirty", &self.dirty_flag)
            .finish()
    }
}
