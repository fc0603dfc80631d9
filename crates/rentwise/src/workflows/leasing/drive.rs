use std::io::Cursor;

use google_drive3::{api::File, api::Scope, DriveHub};
use tokio::runtime::Runtime;

use super::document::{DocumentStore, StoreError};

/// Document store backed by a Google Drive folder.
///
/// Drive calls are async; the store owns a runtime so the synchronous workflow services can
/// upload without exposing async details. Do not call it from inside another tokio runtime.
pub struct GoogleDriveDocumentStore<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    hub: DriveHub<C>,
    runtime: Runtime,
    folder_id: Option<String>,
}

impl<C> GoogleDriveDocumentStore<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    pub fn new(hub: DriveHub<C>, runtime: Runtime, folder_id: Option<String>) -> Self {
        Self {
            hub,
            runtime,
            folder_id,
        }
    }

    pub fn with_runtime(hub: DriveHub<C>, folder_id: Option<String>) -> Result<Self, StoreError> {
        let runtime = Runtime::new().map_err(|err| StoreError::Backend(err.to_string()))?;
        Ok(Self::new(hub, runtime, folder_id))
    }
}

fn map_error<E: std::fmt::Display>(err: E) -> StoreError {
    StoreError::Backend(format!("google drive: {err}"))
}

/// Drive metadata for an upload: the last path segment becomes the file name and the full key
/// is kept in the description.
fn file_metadata(
    key: &str,
    content_type: &str,
    folder_id: Option<&str>,
) -> Result<(File, mime::Mime), StoreError> {
    let mime_type: mime::Mime = content_type.parse().map_err(map_error)?;
    let name = key.rsplit('/').next().unwrap_or(key).to_string();
    let metadata = File {
        name: Some(name),
        description: Some(key.to_string()),
        mime_type: Some(mime_type.essence_str().to_string()),
        parents: folder_id.map(|parent| vec![parent.to_string()]),
        ..File::default()
    };
    Ok((metadata, mime_type))
}

impl<C> std::fmt::Debug for GoogleDriveDocumentStore<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleDriveDocumentStore")
            .field("folder_id", &self.folder_id)
            .finish_non_exhaustive()
    }
}

impl<C> DocumentStore for GoogleDriveDocumentStore<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, StoreError> {
        let (metadata, mime_type) = file_metadata(key, content_type, self.folder_id.as_deref())?;

        let cursor = Cursor::new(bytes.to_vec());
        let result = self.runtime.block_on(async {
            self.hub
                .files()
                .create(metadata)
                .param("fields", "id")
                .supports_all_drives(true)
                .add_scope(Scope::File)
                .upload(cursor, mime_type.clone())
                .await
        });

        let (_, file) = result.map_err(map_error)?;
        let file_id = file
            .id
            .ok_or_else(|| StoreError::Backend("google drive returned no file id".to_string()))?;
        Ok(format!("drive://{file_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_names_the_file_after_the_last_key_segment() {
        let (file, mime_type) = file_metadata(
            "leases/lease-000001/lease.html",
            "text/html; charset=utf-8",
            Some("folder-123"),
        )
        .expect("valid content type");
        assert_eq!(file.name.as_deref(), Some("lease.html"));
        assert_eq!(
            file.description.as_deref(),
            Some("leases/lease-000001/lease.html")
        );
        assert_eq!(file.mime_type.as_deref(), Some("text/html"));
        assert_eq!(file.parents, Some(vec!["folder-123".to_string()]));
        assert_eq!(mime_type.essence_str(), "text/html");
    }

    #[test]
    fn rejects_unparseable_content_types() {
        match file_metadata("lease.html", "not a mime", None) {
            Err(StoreError::Backend(message)) => assert!(message.starts_with("google drive:")),
            other => panic!("expected a backend error, got {other:?}"),
        }
    }
}
