//! Folder data caching layer
//!
//! TTL-based memoization of Drive API results, backed either by a Moka
//! in-memory cache or by a directory of JSON files.

pub mod clock;
pub mod content;
pub mod errors;
pub mod file;
pub mod flight;
pub mod memory;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use content::{cache_key, ContentCache};
pub use errors::StorageError;
pub use file::FileStore;
pub use memory::MemoryStore;
