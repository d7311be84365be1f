//! Object storage sink backed by `object_store`.
//!
//! A destination is addressed by URL:
//! - `s3://bucket/prefix` (credentials from `AWS_*`, see [`S3Credentials`])
//! - `az://container/prefix` (credentials from `AZURE_STORAGE_*`)
//! - `file:///absolute/dir` (created if missing)
//! - `memory://` or `memory:///prefix` (process-local, for tests and dry runs)
//!
//! Every backend above publishes an object with a single request or an
//! atomic rename, so a failed `put` never leaves a partial object behind.

use std::sync::Arc;

use async_trait::async_trait;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutMode, PutOptions, PutPayload};
use tracing::{debug, info};
use url::Url;

use faultline_core::{DestinationName, EncodedPayload, ExtractError, ObjectSink};

use crate::error::{storage_error, ConnectorError};
use crate::s3::{S3Credentials, S3Destination};

/// What to do when an object with the same name already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Replace the existing object. Reruns for the same window converge.
    #[default]
    Overwrite,
    /// Refuse to replace; the upload fails with a storage error.
    CreateOnly,
}

/// Resolve a destination URL into a store and the prefix objects go under.
pub fn build_store(url: &str) -> Result<(Arc<dyn ObjectStore>, ObjectPath), ConnectorError> {
    let parsed = Url::parse(url)?;
    match parsed.scheme() {
        "s3" => {
            let destination = S3Destination::parse(url)?;
            let (store, prefix) = destination.open(&S3Credentials::from_env()?)?;
            Ok((Arc::new(store), prefix))
        }
        "az" | "azure" => {
            let container = parsed
                .host_str()
                .filter(|h| !h.is_empty())
                .ok_or_else(|| ConnectorError::ConfigError(format!("missing container in {}", url)))?;
            let store = MicrosoftAzureBuilder::from_env()
                .with_container_name(container)
                .build()?;
            Ok((Arc::new(store), ObjectPath::from(parsed.path())))
        }
        "file" => {
            let dir = parsed
                .to_file_path()
                .map_err(|_| ConnectorError::ConfigError(format!("not a local path: {}", url)))?;
            std::fs::create_dir_all(&dir).map_err(|e| {
                ConnectorError::ConfigError(format!("cannot create {}: {}", dir.display(), e))
            })?;
            let store = LocalFileSystem::new_with_prefix(&dir)?;
            Ok((Arc::new(store), ObjectPath::default()))
        }
        "memory" => Ok((Arc::new(InMemory::new()), ObjectPath::from(parsed.path()))),
        other => Err(ConnectorError::UnsupportedUri(format!(
            "unsupported destination scheme '{}' in {}",
            other, url
        ))),
    }
}

/// [`ObjectSink`] writing each payload as one object under a fixed prefix.
#[derive(Debug, Clone)]
pub struct ObjectStoreSink {
    store: Arc<dyn ObjectStore>,
    prefix: ObjectPath,
    mode: WriteMode,
}

impl ObjectStoreSink {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: ObjectPath) -> Self {
        Self {
            store,
            prefix,
            mode: WriteMode::default(),
        }
    }

    pub fn from_url(url: &str) -> Result<Self, ConnectorError> {
        let (store, prefix) = build_store(url)?;
        Ok(Self::new(store, prefix))
    }

    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// The store this sink writes into.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Full object path for `name`.
    pub fn location(&self, name: &DestinationName) -> ObjectPath {
        self.prefix.child(name.as_str())
    }
}

#[async_trait]
impl ObjectSink for ObjectStoreSink {
    async fn put(&self, name: &DestinationName, payload: EncodedPayload) -> Result<(), ExtractError> {
        let location = self.location(name);
        let len = payload.len();
        let body = PutPayload::from(payload.into_bytes());

        debug!("Uploading {} bytes to {} ({:?})", len, location, self.mode);
        let result = match self.mode {
            WriteMode::Overwrite => self.store.put(&location, body).await,
            WriteMode::CreateOnly => {
                self.store
                    .put_opts(&location, body, PutOptions::from(PutMode::Create))
                    .await
            }
        };
        result.map_err(storage_error)?;

        info!("Uploaded {} bytes to {}", len, location);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn name() -> DestinationName {
        DestinationName::new("rhylflats", Utc.with_ymd_and_hms(2024, 3, 1, 5, 0, 0).unwrap())
    }

    fn payload(text: &str) -> EncodedPayload {
        EncodedPayload::new(text.as_bytes().to_vec(), 1)
    }

    async fn read(sink: &ObjectStoreSink, name: &DestinationName) -> String {
        let bytes = sink
            .store()
            .get(&sink.location(name))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_location_under_prefix() {
        let sink = ObjectStoreSink::new(Arc::new(InMemory::new()), ObjectPath::from("data-exchange"));
        assert_eq!(
            sink.location(&name()).as_ref(),
            "data-exchange/rhylflats_20240301050000.csv"
        );

        let root = ObjectStoreSink::new(Arc::new(InMemory::new()), ObjectPath::default());
        assert_eq!(root.location(&name()).as_ref(), "rhylflats_20240301050000.csv");
    }

    #[tokio::test]
    async fn test_put_and_overwrite() {
        let sink = ObjectStoreSink::from_url("memory:///exports").unwrap();
        sink.put(&name(), payload("a\n1\n")).await.unwrap();
        assert_eq!(read(&sink, &name()).await, "a\n1\n");

        sink.put(&name(), payload("a\n2\n")).await.unwrap();
        assert_eq!(read(&sink, &name()).await, "a\n2\n");
    }

    #[tokio::test]
    async fn test_create_only_refuses_existing_object() {
        let sink = ObjectStoreSink::from_url("memory://")
            .unwrap()
            .with_mode(WriteMode::CreateOnly);
        sink.put(&name(), payload("a\n1\n")).await.unwrap();

        let err = sink.put(&name(), payload("a\n2\n")).await.unwrap_err();
        assert_eq!(err.kind(), "storage");
        assert_eq!(read(&sink, &name()).await, "a\n1\n");
    }

    #[tokio::test]
    async fn test_local_filesystem_destination() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/out");
        let url = Url::from_directory_path(&target).unwrap();

        let sink = ObjectStoreSink::from_url(url.as_str()).unwrap();
        sink.put(&name(), payload("a\n1\n")).await.unwrap();

        let written = std::fs::read_to_string(target.join("rhylflats_20240301050000.csv")).unwrap();
        assert_eq!(written, "a\n1\n");
    }

    #[test]
    fn test_unsupported_scheme() {
        let err = build_store("ftp://host/dir").unwrap_err();
        assert!(matches!(err, ConnectorError::UnsupportedUri(_)));
    }

    #[test]
    fn test_invalid_url() {
        let err = build_store("not a url").unwrap_err();
        assert!(matches!(err, ConnectorError::UnsupportedUri(_)));
    }

    #[test]
    fn test_azure_requires_container() {
        let err = build_store("az:///prefix").unwrap_err();
        assert!(matches!(err, ConnectorError::ConfigError(_)));
    }
}
