//! Per-file upload pipeline.
//!
//! Each incoming file runs the same sequence: resolve its storage
//! parameters through the configured [`FileInfoProvider`], suspend until
//! the engine's connection reaches a terminal state, then stream the
//! payload into the backend while tallying size and content hash. Files in
//! a batch are independent; they share nothing but the connection.

mod file_info;
mod incoming;
mod pipeline;
mod tally;

pub use file_info::{
    DEFAULT_BUCKET, DEFAULT_CHUNK_SIZE, DefaultFileInfo, FileInfoFn, FileInfoProvider,
    FileOverrides, file_info_fn,
};
pub(crate) use file_info::resolve_params;
pub use incoming::{IncomingFile, UploadRequest};
pub use pipeline::StoredFile;
pub(crate) use pipeline::run;
pub use tally::TallyReader;
