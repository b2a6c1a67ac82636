//! Per-file storage parameter resolution.

use gridgate_client::FileParams;
use uuid::Uuid;

use super::incoming::{IncomingFile, UploadRequest};
use crate::Result;

/// Default chunk size for stored payloads, in bytes.
pub const DEFAULT_CHUNK_SIZE: u32 = 261_120;

/// Default bucket files are stored in.
pub const DEFAULT_BUCKET: &str = "fs";

/// Content type used when neither the provider nor the incoming file names one.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Per-file storage parameter overrides.
///
/// Every field is optional; whatever the provider leaves out falls back to
/// the engine defaults. `FileOverrides::default()` means "all defaults",
/// and a bare filename converts directly:
///
/// ```rust,ignore
/// let overrides: FileOverrides = "custom-name".into();
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileOverrides {
    /// Stored filename; default is the hex form of 16 random bytes,
    /// with no extension
    pub filename: Option<String>,
    /// Object identifier; default is a fresh UUIDv4
    pub id: Option<Uuid>,
    /// Target bucket; default `"fs"`
    pub bucket: Option<String>,
    /// Chunk size in bytes; default 261120
    pub chunk_size: Option<u32>,
    /// Metadata document; default none
    pub metadata: Option<serde_json::Value>,
    /// Content type; default is the incoming file's, else
    /// `application/octet-stream`
    pub content_type: Option<String>,
}

impl FileOverrides {
    /// Override only the filename, leaving everything else defaulted.
    pub fn filename(name: impl Into<String>) -> Self {
        Self {
            filename: Some(name.into()),
            ..Self::default()
        }
    }

    /// Set the object identifier.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the target bucket.
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Set the chunk size in bytes.
    pub fn with_chunk_size(mut self, chunk_size: u32) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Attach a metadata document.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

impl From<String> for FileOverrides {
    fn from(name: String) -> Self {
        Self::filename(name)
    }
}

impl From<&str> for FileOverrides {
    fn from(name: &str) -> Self {
        Self::filename(name)
    }
}

/// Async per-file callback consulted before each upload.
///
/// Implement the trait directly when resolution needs to await something;
/// for plain synchronous logic, wrap a closure with [`file_info_fn`].
#[async_trait::async_trait]
pub trait FileInfoProvider: Send + Sync {
    /// Produce the overrides for one incoming file.
    ///
    /// An error aborts only this upload; sibling files are unaffected.
    async fn file_info(&self, request: &UploadRequest, file: &IncomingFile)
    -> Result<FileOverrides>;
}

/// Adapter returned by [`file_info_fn`].
#[derive(Debug, Clone, Copy)]
pub struct FileInfoFn<F>(F);

/// Turn a plain closure into a [`FileInfoProvider`].
pub fn file_info_fn<F>(f: F) -> FileInfoFn<F>
where
    F: Fn(&UploadRequest, &IncomingFile) -> Result<FileOverrides> + Send + Sync,
{
    FileInfoFn(f)
}

#[async_trait::async_trait]
impl<F> FileInfoProvider for FileInfoFn<F>
where
    F: Fn(&UploadRequest, &IncomingFile) -> Result<FileOverrides> + Send + Sync,
{
    async fn file_info(
        &self,
        request: &UploadRequest,
        file: &IncomingFile,
    ) -> Result<FileOverrides> {
        (self.0)(request, file)
    }
}

/// The provider used when the configuration supplies none: all defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFileInfo;

#[async_trait::async_trait]
impl FileInfoProvider for DefaultFileInfo {
    async fn file_info(
        &self,
        _request: &UploadRequest,
        _file: &IncomingFile,
    ) -> Result<FileOverrides> {
        Ok(FileOverrides::default())
    }
}

/// Apply defaults to whatever the provider left unset.
pub(crate) fn resolve_params(overrides: FileOverrides, file: &IncomingFile) -> FileParams {
    FileParams {
        id: overrides.id.unwrap_or_else(Uuid::new_v4),
        filename: overrides.filename.unwrap_or_else(random_filename),
        bucket: overrides
            .bucket
            .unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
        chunk_size: overrides.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
        metadata: overrides.metadata,
        content_type: overrides
            .content_type
            .or_else(|| file.content_type.clone())
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string()),
    }
}

fn random_filename() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}
