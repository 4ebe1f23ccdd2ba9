//! Blob publishing: uploads artifacts and fetches the branding image.

use std::path::Path;
use std::sync::Arc;

use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, ObjectStoreExt, PutPayload};
use tracing::{error, info};

use crate::contract::BlobStoreConnector;
use crate::error::PublishError;

/// A blob store scoped to the report container.
///
/// Other containers of the same account are reached through the connector
/// on demand, so [`ArtifactPublisher::download_image`] can read from any of
/// them.
pub struct ArtifactPublisher {
    connector: Arc<dyn BlobStoreConnector>,
    connection_string: String,
    container: String,
    store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for ArtifactPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactPublisher")
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

impl ArtifactPublisher {
    pub fn connect(
        connector: Arc<dyn BlobStoreConnector>,
        connection_string: impl Into<String>,
        container: impl Into<String>,
    ) -> Result<Self, PublishError> {
        let connection_string = connection_string.into();
        let container = container.into();
        let store = connector.container(&connection_string, &container)?;
        Ok(Self {
            connector,
            connection_string,
            container,
            store,
        })
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Upload the file at `local_path` as `blob_name`, replacing any blob of
    /// the same name.
    pub async fn upload(&self, local_path: &Path, blob_name: &str) -> Result<(), PublishError> {
        let upload_error = |reason: String| PublishError::Upload {
            container: self.container.clone(),
            blob: blob_name.to_string(),
            reason,
        };

        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|e| upload_error(format!("reading {}: {e}", local_path.display())))?;
        let size = bytes.len();

        let location = ObjectPath::from(blob_name);
        if let Err(e) = self.store.put(&location, PutPayload::from(bytes)).await {
            error!(
                container = %self.container,
                blob = %blob_name,
                error = %e,
                "[REPORT][UPLOAD] Upload failed"
            );
            return Err(upload_error(e.to_string()));
        }

        info!(
            container = %self.container,
            blob = %blob_name,
            size,
            "[REPORT][UPLOAD] Uploaded artifact"
        );
        Ok(())
    }

    /// Read a whole blob into memory.
    pub async fn download_image(
        &self,
        container_name: &str,
        image_name: &str,
    ) -> Result<Vec<u8>, PublishError> {
        let download_error = |reason: String| PublishError::Download {
            container: container_name.to_string(),
            blob: image_name.to_string(),
            reason,
        };

        let store = if container_name == self.container {
            Arc::clone(&self.store)
        } else {
            self.connector
                .container(&self.connection_string, container_name)?
        };

        let location = ObjectPath::from(image_name);
        let result = store
            .get(&location)
            .await
            .map_err(|e| download_error(e.to_string()))?;
        let bytes = result
            .bytes()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        info!(
            container = %container_name,
            blob = %image_name,
            size = bytes.len(),
            "[REPORT][DOWNLOAD] Downloaded blob"
        );
        Ok(bytes.to_vec())
    }
}
