use crate::config::BlobConfig;
use crate::http::build_client;
use crate::metrics::UpstreamTimer;
use crate::storage::{StorageError, StoredFile, UploadFile, sanitize_file_name};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use urlencoding::encode;
use uuid::Uuid;

const API_VERSION: &str = "7";
const PATH_PREFIX: &str = "crosslist";

#[derive(Clone)]
pub struct BlobStore {
    http: Client,
    config: BlobConfig,
}

#[derive(Deserialize)]
struct PutResponse {
    url: String,
}

impl BlobStore {
    pub fn new(config: BlobConfig) -> Self {
        Self {
            http: build_client(),
            config,
        }
    }

    fn token(&self) -> Result<&str, StorageError> {
        self.config
            .token
            .as_deref()
            .ok_or(StorageError::MissingCredentials("BLOB_READ_WRITE_TOKEN"))
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Public PUT under `crosslist/<uuid>-<name>`. The blob URL doubles as its id.
    pub async fn put(&self, file: &UploadFile) -> Result<StoredFile, StorageError> {
        let token = self.token()?;
        let pathname = format!(
            "{PATH_PREFIX}/{}-{}",
            Uuid::new_v4().simple(),
            sanitize_file_name(&file.file_name)
        );
        let url = format!("{}/{}", self.base(), encode(&pathname));

        let mut request = self
            .http
            .put(url)
            .bearer_auth(token)
            .header("x-api-version", API_VERSION)
            .body(file.bytes.clone());
        if let Some(content_type) = &file.content_type {
            request = request.header("x-content-type", content_type);
        }

        let timer = UpstreamTimer::start("vercel_blob");
        let response = request
            .send()
            .await
            .map_err(|err| StorageError::Request(err.to_string()))?;
        let status = response.status();
        timer.finish(status.is_success());
        if !status.is_success() {
            return Err(StorageError::Request(format!("HTTP {status}")));
        }
        let payload: PutResponse = response
            .json()
            .await
            .map_err(|err| StorageError::InvalidResponse(err.to_string()))?;
        debug!(target = "crosslist.storage", pathname = %pathname, "blob_stored");
        Ok(StoredFile {
            id: payload.url.clone(),
            url: payload.url,
        })
    }

    pub async fn delete(&self, url: &str) -> Result<(), StorageError> {
        let token = self.token()?;
        let response = self
            .http
            .post(format!("{}/delete", self.base()))
            .bearer_auth(token)
            .header("x-api-version", API_VERSION)
            .json(&json!({ "urls": [url] }))
            .send()
            .await
            .map_err(|err| StorageError::Request(err.to_string()))?;
        if !response.status().is_success() {
            return Err(StorageError::Request(format!("HTTP {}", response.status())));
        }
        Ok(())
    }
}
