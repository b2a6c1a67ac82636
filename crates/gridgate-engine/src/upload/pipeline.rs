//! The streaming stage of an upload: backend write plus outcome reporting.

use gridgate_client::{ClientHandle, FileParams};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::incoming::IncomingFile;
use super::tally::TallyReader;
use crate::events::{Event, EventBus};
use crate::{Error, Result};

/// Tracing target for upload operations.
const TRACING_TARGET: &str = "gridgate_engine::upload";

/// Record of a successfully stored file.
///
/// The storage parameters and backend results merged onto the incoming
/// file's descriptor; this is what `begin_file` resolves with and what
/// `remove_file` later takes to delete the object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    /// Generated object identifier
    pub id: Uuid,
    /// Stored filename
    pub filename: String,
    /// Bucket the object lives in
    pub bucket: String,
    /// Chunk size the payload was split with
    pub chunk_size: u32,
    /// Metadata document, if any
    pub metadata: Option<serde_json::Value>,
    /// MIME content type
    pub content_type: String,
    /// Total payload size in bytes
    pub size: u64,
    /// Hex SHA-256 of the payload
    pub content_hash: String,
    /// Backend timestamp of the completed write
    pub upload_date: jiff::Timestamp,
    /// Form field the file arrived under
    pub field_name: String,
    /// Client-supplied filename, if any
    pub original_name: Option<String>,
}

/// Stream one file into the backend and report the outcome.
///
/// Failure aborts only this upload: the tally reader (and with it the
/// incoming stream) is dropped, nothing further reaches the half-written
/// object, and sibling uploads sharing the connection are untouched.
pub(crate) async fn run(
    handle: ClientHandle,
    params: FileParams,
    file: IncomingFile,
    events: &EventBus,
) -> Result<StoredFile> {
    let IncomingFile {
        field_name,
        original_name,
        reader,
        ..
    } = file;

    tracing::debug!(
        target: TRACING_TARGET,
        bucket = %params.bucket,
        id = %params.id,
        filename = %params.filename,
        "starting upload"
    );

    let mut tally = TallyReader::new(reader);
    match handle.store(&params, &mut tally).await {
        Ok(stored) => {
            let (content_hash, bytes_read) = tally.finalize();

            tracing::info!(
                target: TRACING_TARGET,
                bucket = %params.bucket,
                id = %params.id,
                filename = %params.filename,
                size = stored.size,
                bytes_read,
                "upload complete"
            );

            let stored_file = StoredFile {
                id: params.id,
                filename: params.filename,
                bucket: params.bucket,
                chunk_size: params.chunk_size,
                metadata: params.metadata,
                content_type: params.content_type,
                size: stored.size,
                content_hash,
                upload_date: stored.upload_date,
                field_name,
                original_name,
            };
            events.emit(Event::FileStored(stored_file.clone()));
            Ok(stored_file)
        }
        Err(error) => {
            tracing::error!(
                target: TRACING_TARGET,
                bucket = %params.bucket,
                id = %params.id,
                filename = %params.filename,
                error = %error,
                "upload failed"
            );

            let error = Error::from(error);
            events.emit(Event::StreamError {
                error: error.clone(),
                params,
            });
            Err(error)
        }
    }
}
