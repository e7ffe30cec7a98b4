use crate::common::error::{DbError, Result};
use crate::storage::page::page::{Page, PageId, PAGE_SIZE};
use log::info;
#[cfg(test)]
use mockall::automock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Whole-page I/O against a backing store addressed by page id.
#[cfg_attr(test, automock)]
pub trait DiskManager {
    /// `Ok(None)` when the page was never written.
    fn read_page(&mut self, page_id: PageId) -> Result<Option<Page>>;

    fn write_page(&mut self, page: &Page) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

fn page_offset(page_id: PageId) -> u64 {
    page_id as u64 * PAGE_SIZE as u64
}

/// In-memory page store. Keeps the same "absent until written" semantics as
/// the file-backed store.
#[derive(Default)]
pub struct MemoryDiskManager {
    pages: Vec<Option<Box<[u8; PAGE_SIZE]>>>,
    closed: bool,
}

impl MemoryDiskManager {
    pub fn new() -> MemoryDiskManager {
        MemoryDiskManager::default()
    }

    pub fn page_count(&self) -> usize {
        self.pages.iter().filter(|p| p.is_some()).count()
    }
}

impl DiskManager for MemoryDiskManager {
    fn read_page(&mut self, page_id: PageId) -> Result<Option<Page>> {
        if self.closed {
            return Err(DbError::Closed);
        }

        Ok(self
            .pages
            .get(page_id)
            .and_then(|slot| slot.as_ref())
            .map(|bytes| Page::from_bytes(page_id, **bytes)))
    }

    fn write_page(&mut self, page: &Page) -> Result<()> {
        if self.closed {
            return Err(DbError::Closed);
        }

        let page_id = page.get_id();
        if self.pages.len() <= page_id {
            self.pages.resize(page_id + 1, None);
        }
        self.pages[page_id] = Some(Box::new(*page.get_data()));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Page store backed by one random-access file, page `i` at byte `i * PAGE_SIZE`.
pub struct FileDiskManager {
    path: PathBuf,
    file: Option<File>,
}

impl FileDiskManager {
    pub fn new(file_path: &Path) -> Result<FileDiskManager> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(file_path)?;
        info!("Opened page file {:?} ({} bytes).", file_path, file.metadata()?.len());

        Ok(FileDiskManager {
            path: file_path.to_path_buf(),
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(DbError::Closed)
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&mut self, page_id: PageId) -> Result<Option<Page>> {
        let file = self.file()?;
        let offset = page_offset(page_id);
        if offset + PAGE_SIZE as u64 > file.metadata()?.len() {
            return Ok(None);
        }

        let mut page = Page::new(page_id);
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(page.get_data_mut())?;
        Ok(Some(page))
    }

    fn write_page(&mut self, page: &Page) -> Result<()> {
        let offset = page_offset(page.get_id());
        let file = self.file()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(page.get_data())?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
            info!("Closed page file {:?}.", self.path);
        }
        Ok(())
    }
}
