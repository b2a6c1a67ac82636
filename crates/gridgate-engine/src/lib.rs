#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod engine;
mod error;
mod events;
pub mod prelude;
pub mod upload;

pub use config::{CacheMode, ClientSource, EngineConfig};
pub use engine::GridEngine;
pub use error::{Error, Result};
pub use events::{Event, EventBus};
pub use upload::{
    DEFAULT_BUCKET, DEFAULT_CHUNK_SIZE, DefaultFileInfo, FileInfoFn, FileInfoProvider,
    FileOverrides, IncomingFile, StoredFile, UploadRequest, file_info_fn,
};
