pub mod page_chain;
pub mod record_id;
pub mod record_manager;
pub mod spatial_record_manager;
