pub mod common;
pub mod storage;
pub mod buffer;
pub mod record;
pub mod index;

pub use common::error::{DbError, Result};
