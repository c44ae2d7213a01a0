pub mod cache;
pub mod engine;
pub mod filter;
pub mod memory;
pub mod relaxed_json;
pub mod store;
pub mod summary;
