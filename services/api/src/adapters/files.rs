//! services/api/src/adapters/files.rs
//!
//! Adapters for the `FileStore` port: a local directory for uploads dropped
//! on disk, and a Google Cloud Storage bucket read through its JSON API.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use notebase_core::ports::{FileStore, PortError, PortResult};
use reqwest::{StatusCode, Url};
use tracing::{debug, info_span, Instrument};

//=========================================================================================
// Local Directory
//=========================================================================================

/// Reads extract files from a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves `name` inside the root. Only plain relative names are accepted.
    fn resolve(&self, name: &str) -> PortResult<PathBuf> {
        let candidate = Path::new(name);
        let is_plain = !name.is_empty()
            && candidate
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(PortError::NotFound(format!("File {} not found", name)));
        }
        Ok(self.root.join(candidate))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn read(&self, name: &str) -> PortResult<Vec<u8>> {
        let path = self.resolve(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!(path = %path.display(), size = bytes.len(), "Read extract file");
                Ok(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PortError::NotFound(format!("File {} not found", name)))
            }
            Err(e) => Err(PortError::Unexpected(format!(
                "reading {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

//=========================================================================================
// Google Cloud Storage
//=========================================================================================

/// Reads extract objects from a GCS bucket.
#[derive(Debug, Clone)]
pub struct GcsFileStore {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    access_token: Option<String>,
}

impl GcsFileStore {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        bucket: String,
        access_token: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url,
            bucket,
            access_token,
        }
    }

    /// `{base}/storage/v1/b/{bucket}/o/{name}?alt=media`, with each segment escaped.
    pub fn object_url(&self, name: &str) -> PortResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| PortError::Unexpected(format!("invalid GCS base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| PortError::Unexpected("GCS base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["storage", "v1", "b", self.bucket.as_str(), "o", name]);
        url.query_pairs_mut().append_pair("alt", "media");
        Ok(url)
    }
}

#[async_trait]
impl FileStore for GcsFileStore {
    async fn read(&self, name: &str) -> PortResult<Vec<u8>> {
        let url = self.object_url(name)?;
        let span = info_span!("gcs_read", bucket = %self.bucket, object = name);

        async {
            let mut request = self.client.get(url);
            if let Some(token) = &self.access_token {
                request = request.bearer_auth(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;

            match response.status() {
                status if status.is_success() => {
                    let body = response
                        .bytes()
                        .await
                        .map_err(|e| PortError::Unexpected(e.to_string()))?;
                    debug!(size = body.len(), "Read extract object");
                    Ok(body.to_vec())
                }
                StatusCode::NOT_FOUND => Err(PortError::NotFound(format!(
                    "Object {} not found in bucket {}",
                    name, self.bucket
                ))),
                status => Err(PortError::Unexpected(format!(
                    "GCS returned {} for object {}",
                    status, name
                ))),
            }
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn local_store_reads_files_under_its_root() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("extract.json"), b"{\"asin\":\"B001\"}").unwrap();
        let store = LocalFileStore::new(dir.path());

        let bytes = store.read("extract.json").await.unwrap();
        assert_eq!(bytes, b"{\"asin\":\"B001\"}");
    }

    #[tokio::test]
    async fn local_store_reports_missing_files_as_not_found() {
        let dir = tempdir().expect("tempdir");
        let store = LocalFileStore::new(dir.path());
        assert!(matches!(
            store.read("absent.json").await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn local_store_refuses_to_leave_its_root() {
        let dir = tempdir().expect("tempdir");
        let store = LocalFileStore::new(dir.path().join("inner"));
        std::fs::create_dir_all(dir.path().join("inner")).unwrap();
        std::fs::write(dir.path().join("secret.json"), b"{}").unwrap();

        for name in ["../secret.json", "/etc/passwd", ""] {
            assert!(store.read(name).await.is_err(), "{} should be rejected", name);
        }
    }

    #[test]
    fn gcs_object_url_escapes_the_object_name() {
        let store = GcsFileStore::new(
            reqwest::Client::new(),
            "https://storage.googleapis.com".to_string(),
            "books".to_string(),
            None,
        );
        let url = store.object_url("kindle/my book.json").unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/books/o/kindle%2Fmy%20book.json?alt=media"
        );
    }
}
