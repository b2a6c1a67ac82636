#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod cache;
mod driver;
mod error;
pub mod memory;
mod normalize;
pub mod prelude;
mod target;

pub use cache::{CacheEntry, ClientCache, EntryState};
pub use driver::{ClientHandle, FileParams, GridClient, GridDriver, StoredObject};
pub use error::{Error, Result};
pub use memory::{MemoryGrid, MemoryGridDriver};
pub use normalize::{CacheKey, normalize_options};
pub use target::StorageTarget;
