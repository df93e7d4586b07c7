//! Remote object API client.
//!
//! [`RemoteDrive`] is the seam the relay handlers talk through; the caller's
//! provider access token authorizes every call. [`DriveClient`] is the HTTP
//! implementation against a Google Drive-shaped files API.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt, stream::BoxStream};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::DriveConfig;
use crate::{Error, Result};

/// Size and content type of a remote object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Total object size in bytes
    pub size: u64,
    /// Content type reported by the object API
    pub mime_type: String,
}

/// A finite, non-restartable sequence of body chunks from the upstream.
pub type ByteStream = BoxStream<'static, std::result::Result<Bytes, std::io::Error>>;

/// Remote object API operations the relay depends on.
#[async_trait]
pub trait RemoteDrive: Send + Sync {
    /// Fetch size and content type for an object
    async fn object_metadata(&self, id: &str, access_token: &str) -> Result<ObjectMetadata>;

    /// Open a byte stream over `start..=end` of an object
    async fn object_range(
        &self,
        id: &str,
        access_token: &str,
        start: u64,
        end: u64,
    ) -> Result<ByteStream>;

    /// Identifier of the first folder matching `name`, if any
    async fn find_folder(&self, name: &str, access_token: &str) -> Result<Option<String>>;
}

#[derive(Debug, Deserialize)]
struct MetadataResponse {
    /// The files API reports size as a decimal string
    size: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    id: String,
    #[allow(dead_code)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileListResponse {
    #[serde(default)]
    files: Vec<FileEntry>,
}

/// HTTP implementation of [`RemoteDrive`].
pub struct DriveClient {
    http: Client,
    base_url: String,
}

impl DriveClient {
    /// Create a client over a shared HTTP client.
    #[must_use]
    pub fn new(http: Client, config: &DriveConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RemoteDrive for DriveClient {
    async fn object_metadata(&self, id: &str, access_token: &str) -> Result<ObjectMetadata> {
        let response = self
            .http
            .get(format!("{}/files/{id}", self.base_url))
            .query(&[("fields", "size,mimeType")])
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("Metadata fetch failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(object = %id, %status, body = %body, "Object API rejected metadata fetch");
            return Err(Error::Upstream(format!(
                "Metadata fetch failed: HTTP {status}"
            )));
        }

        let metadata: MetadataResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("Malformed metadata response: {e}")))?;

        let size = metadata
            .size
            .parse()
            .map_err(|_| Error::Upstream(format!("Non-numeric object size: {}", metadata.size)))?;

        Ok(ObjectMetadata {
            size,
            mime_type: metadata.mime_type,
        })
    }

    async fn object_range(
        &self,
        id: &str,
        access_token: &str,
        start: u64,
        end: u64,
    ) -> Result<ByteStream> {
        debug!(object = %id, start, end, "Opening upstream byte stream");

        let response = self
            .http
            .get(format!("{}/files/{id}", self.base_url))
            .query(&[("alt", "media")])
            .bearer_auth(access_token)
            .header(reqwest::header::RANGE, format!("bytes={start}-{end}"))
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("Content fetch failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(object = %id, %status, body = %body, "Object API rejected content fetch");
            return Err(Error::Upstream(format!(
                "Content fetch failed: HTTP {status}"
            )));
        }

        Ok(response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed())
    }

    async fn find_folder(&self, name: &str, access_token: &str) -> Result<Option<String>> {
        // Single quotes inside the name would break out of the query literal
        let escaped = name.replace('\'', "\\'");
        let query =
            format!("name='{escaped}' and mimeType='application/vnd.google-apps.folder'");

        let response = self
            .http
            .get(format!("{}/files", self.base_url))
            .query(&[("q", query.as_str()), ("fields", "files(id,name)")])
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("Folder lookup failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(folder = %name, %status, body = %body, "Object API rejected folder lookup");
            return Err(Error::Upstream(format!(
                "Folder lookup failed: HTTP {status}"
            )));
        }

        let listing: FileListResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("Malformed folder listing: {e}")))?;

        Ok(listing.files.into_iter().next().map(|f| f.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let config = DriveConfig {
            base_url: "https://example.com/drive/v3/".to_string(),
            chunk_size: 1,
        };
        let client = DriveClient::new(Client::new(), &config);
        assert_eq!(client.base_url, "https://example.com/drive/v3");
    }

    #[test]
    fn metadata_size_is_a_decimal_string() {
        let metadata: MetadataResponse =
            serde_json::from_str(r#"{"size":"2000000","mimeType":"video/mp4"}"#).unwrap();
        assert_eq!(metadata.size, "2000000");
        assert_eq!(metadata.mime_type, "video/mp4");
    }

    #[test]
    fn folder_listing_may_be_empty() {
        let listing: FileListResponse = serde_json::from_str(r#"{"files":[]}"#).unwrap();
        assert!(listing.files.is_empty());

        let listing: FileListResponse =
            serde_json::from_str(r#"{"files":[{"id":"f1","name":"videos"},{"id":"f2"}]}"#).unwrap();
        assert_eq!(listing.files[0].id, "f1");
    }
}
