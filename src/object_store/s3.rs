use async_trait::async_trait;
use aws_sdk_s3 as s3;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::DateTime;
use uuid::Uuid;

use super::{
    normalize_filename, project_prefix, Download, DownloadBody, ObjectStore, ObjectStoreError,
    StoredFile,
};
use crate::config::{S3Config, StorageBackend};

/// S3-compatible object store. Documents live at `<project hex>/<normalized name>`.
pub struct S3Store {
    bucket: String,
    client: s3::Client,
}

impl S3Store {
    pub fn new(client: s3::Client, bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            client,
        }
    }

    /// Build a client from the ambient AWS configuration (env, profile, instance role).
    pub async fn from_config(config: &S3Config) -> Self {
        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        let mut builder = s3::config::Builder::from(&shared).force_path_style(config.force_path_style);
        if let Some(ref endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self::new(s3::Client::from_conf(builder.build()), &config.bucket)
    }

    /// Delete the `<prefix>/` marker object when nothing else is left under the prefix.
    async fn remove_empty_prefix(&self, prefix: &str) -> Result<(), ObjectStoreError> {
        let marker = format!("{prefix}/");

        // Two keys are enough: the marker itself may be the first one listed
        let listing = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&marker)
            .max_keys(2)
            .send()
            .await
            .map_err(|e| {
                ObjectStoreError::Backend(format!(
                    "failed to list prefix {marker}: {}",
                    DisplayErrorContext(e)
                ))
            })?;

        let has_children = listing
            .contents()
            .iter()
            .filter_map(|object| object.key())
            .any(|key| key != marker);

        if !has_children {
            // S3 reports success for absent keys; other stores may not, which is fine here
            if let Err(e) = self
                .client
                .delete_object()
                .bucket(&self.bucket)
                .key(&marker)
                .send()
                .await
            {
                tracing::debug!(marker = %marker, error = %DisplayErrorContext(e), "No prefix marker to delete");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn backend(&self) -> StorageBackend {
        StorageBackend::S3
    }

    #[tracing::instrument(skip(self, data), fields(bucket = %self.bucket))]
    async fn save(
        &self,
        project_id: Uuid,
        file_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<StoredFile, ObjectStoreError> {
        let file_name = normalize_filename(file_name);
        let key = format!("{}/{}", project_prefix(project_id), file_name);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                ObjectStoreError::Backend(format!("failed to put {key}: {}", DisplayErrorContext(e)))
            })?;

        Ok(StoredFile {
            file_name,
            content_type: content_type.to_string(),
            storage_path: key,
            backend: StorageBackend::S3,
        })
    }

    #[tracing::instrument(skip(self), fields(bucket = %self.bucket))]
    async fn remove(&self, storage_path: &str) -> Result<(), ObjectStoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(storage_path)
            .send()
            .await
            .map_err(|e| {
                ObjectStoreError::Backend(format!(
                    "failed to delete {storage_path}: {}",
                    DisplayErrorContext(e)
                ))
            })?;

        if let Some((prefix, _)) = storage_path.split_once('/') {
            // The object itself is gone; a failed cleanup only leaves an empty marker behind
            if let Err(e) = self.remove_empty_prefix(prefix).await {
                tracing::warn!(storage_path, error = %e, "Failed to clean up empty prefix");
            }
        }

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(bucket = %self.bucket))]
    async fn download(&self, storage_path: &str) -> Result<Download, ObjectStoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(storage_path)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map(|se| se.is_no_such_key()) == Some(true) {
                    ObjectStoreError::NotFound(storage_path.to_string())
                } else {
                    ObjectStoreError::Backend(format!(
                        "failed to get {storage_path}: {}",
                        DisplayErrorContext(e)
                    ))
                }
            })?;

        let content_length = output.content_length().and_then(|len| u64::try_from(len).ok());
        let last_modified = output
            .last_modified()
            .and_then(|ts| DateTime::from_timestamp(ts.secs(), ts.subsec_nanos()));
        let content_type = output.content_type().map(|ct| ct.to_string());

        Ok(Download {
            body: DownloadBody::Stream(Box::pin(output.body.into_async_read())),
            content_length,
            last_modified,
            content_type,
        })
    }
}
