pub mod archive_store;
pub mod elevation;
pub mod error;
