//! Prelude module for gridgate-engine.
//!
//! Re-exports the most commonly used types and traits so a single `use`
//! statement covers typical usage.
//!
//! # Example
//!
//! ```rust,ignore
//! use gridgate_engine::prelude::*;
//!
//! # async fn example(driver: std::sync::Arc<dyn GridDriver>) -> Result<()> {
//! let engine = GridEngine::new(
//!     EngineConfig::new()
//!         .with_url("grid://h1:9410,h2:9410/files")
//!         .with_driver(driver)
//!         .with_cache("uploads"),
//! )?;
//! # Ok(())
//! # }
//! ```

// Client-layer types commonly needed alongside the engine
pub use gridgate_client::{ClientHandle, FileParams, GridClient, GridDriver, StorageTarget};

// Configuration
pub use crate::config::{CacheMode, ClientSource, EngineConfig};
// The facade
pub use crate::engine::GridEngine;
// Events
pub use crate::events::{Event, EventBus};
// Upload types
pub use crate::upload::{
    DEFAULT_BUCKET, DEFAULT_CHUNK_SIZE, DefaultFileInfo, FileInfoFn, FileInfoProvider,
    FileOverrides, IncomingFile, StoredFile, UploadRequest, file_info_fn,
};
// Error types
pub use crate::{Error, Result};
