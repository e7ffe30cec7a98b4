use std::io;
use thiserror::Error;

/// Errors surfaced by the storage engine.
///
/// A full page and a missing key are not errors; they are reported as
/// `None` by the operations that can produce them.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No free page left within {max_pages} pages.")]
    PageSpaceExhausted { max_pages: usize },

    #[error("Invalid geohash character: {0:?}")]
    InvalidGeohash(char),

    #[error("Record of {size} bytes exceeds page capacity of {max} bytes.")]
    RecordTooLarge { size: usize, max: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Search radius must be a finite number of kilometres, got {0}.")]
    InvalidRadius(f64),

    #[error("Page id {0} does not fit an overflow link.")]
    UnlinkablePage(usize),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Disk manager is closed.")]
    Closed,
}

pub type Result<T> = std::result::Result<T, DbError>;
