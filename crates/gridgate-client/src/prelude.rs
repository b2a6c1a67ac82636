//! Prelude module for gridgate-client.
//!
//! Re-exports the most commonly used types and traits so a single `use`
//! statement covers typical usage.
//!
//! # Example
//!
//! ```rust,ignore
//! use gridgate_client::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let target = StorageTarget::parse("grid://h1:9410,h2:9410/files")?;
//! let key = CacheKey::derive(&target, Some("uploads"));
//! # Ok(())
//! # }
//! ```

// Identity types
pub use crate::normalize::CacheKey;
pub use crate::target::StorageTarget;
// Cache types
pub use crate::cache::{CacheEntry, ClientCache, EntryState};
// Driver seams
pub use crate::driver::{ClientHandle, FileParams, GridClient, GridDriver, StoredObject};
// Reference backend
pub use crate::memory::{MemoryGrid, MemoryGridDriver};
// Error types
pub use crate::{Error, Result};
