//! Incoming upload descriptors handed over by the host middleware.

use std::collections::BTreeMap;

use tokio::io::AsyncRead;

/// The middleware request an upload arrived on.
///
/// Deliberately minimal: the engine never parses requests itself, it only
/// passes this through to the per-file info provider.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    /// Request path
    pub path: String,
    /// Request headers relevant to the upload
    pub headers: BTreeMap<String, String>,
}

impl UploadRequest {
    /// Create a request descriptor for `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Attach a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// One incoming file: its descriptor plus the byte stream to consume.
pub struct IncomingFile {
    /// Form field the file arrived under
    pub field_name: String,
    /// Client-supplied filename, if any
    pub original_name: Option<String>,
    /// Client-supplied content type, if any
    pub content_type: Option<String>,
    pub(crate) reader: Box<dyn AsyncRead + Send + Sync + Unpin>,
}

impl IncomingFile {
    /// Wrap a byte stream as an incoming file.
    pub fn new(
        field_name: impl Into<String>,
        reader: impl AsyncRead + Send + Sync + Unpin + 'static,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            original_name: None,
            content_type: None,
            reader: Box::new(reader),
        }
    }

    /// Convenience constructor over an in-memory payload.
    pub fn from_bytes(field_name: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self::new(field_name, std::io::Cursor::new(payload.into()))
    }

    /// Set the client-supplied filename.
    pub fn with_original_name(mut self, name: impl Into<String>) -> Self {
        self.original_name = Some(name.into());
        self
    }

    /// Set the client-supplied content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

impl std::fmt::Debug for IncomingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncomingFile")
            .field("field_name", &self.field_name)
            .field("original_name", &self.original_name)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}
