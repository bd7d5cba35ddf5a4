use crate::http::build_client;
use crate::models::{
    ApiError, AssignRequest, AssignResponse, Batch, CompsRequest, CompsSummary, LastSkuResponse,
    LastSkuWrite, ListingDraft, ListingRequest, OkResponse, UploadResponse,
};
use crate::storage::UploadFile;
use reqwest::{
    Client, RequestBuilder, StatusCode,
    multipart::{Form, Part},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{status}: {message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Request(err) => err.status().map(|s| s.as_u16()),
        }
    }
}

/// Typed wrapper over the service's HTTP routes.
#[derive(Clone)]
pub struct CrossListClient {
    http: Client,
    base_url: String,
}

impl CrossListClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(build_client(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&text)
            .map(|err| err.error)
            .unwrap_or_else(|_| {
                if text.is_empty() {
                    status.to_string()
                } else {
                    text
                }
            });
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn health(&self) -> Result<Value, ClientError> {
        self.send(self.http.get(self.url("/health"))).await
    }

    pub async fn generate_listing(
        &self,
        sku: &str,
        images: &[String],
    ) -> Result<ListingDraft, ClientError> {
        let body = ListingRequest {
            sku: sku.to_string(),
            images: images.to_vec(),
        };
        self.send(self.http.post(self.url("/api/ai/listing")).json(&body))
            .await
    }

    pub async fn find_comps(&self, title: &str) -> Result<CompsSummary, ClientError> {
        let body = CompsRequest {
            title: Some(title.to_string()),
        };
        self.send(self.http.post(self.url("/api/ebay/comps")).json(&body))
            .await
    }

    pub async fn upload(&self, file: &UploadFile) -> Result<UploadResponse, ClientError> {
        let mut part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type)?;
        }
        let form = Form::new().part("file", part);
        self.send(self.http.post(self.url("/api/upload")).multipart(form))
            .await
    }

    pub async fn delete_upload(&self, id: &str) -> Result<(), ClientError> {
        let _: OkResponse = self
            .send(self.http.delete(self.url("/api/upload")).query(&[("id", id)]))
            .await?;
        Ok(())
    }

    pub async fn load_batches(&self) -> Result<Vec<Batch>, ClientError> {
        self.send(self.http.get(self.url("/api/batches"))).await
    }

    /// `None` when the service has no batch under `sku`.
    pub async fn load_batch(&self, sku: &str) -> Result<Option<Batch>, ClientError> {
        let path = format!("/api/batches/{}", urlencoding::encode(sku));
        match self.send(self.http.get(self.url(&path))).await {
            Ok(batch) => Ok(Some(batch)),
            Err(ClientError::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn load_last_sku(&self) -> Result<Option<String>, ClientError> {
        let response: LastSkuResponse = self
            .send(
                self.http
                    .get(self.url("/api/batches"))
                    .query(&[("lastSku", "1")]),
            )
            .await?;
        Ok(response.last_sku)
    }

    pub async fn save_batch(&self, batch: &Batch) -> Result<Batch, ClientError> {
        self.send(self.http.post(self.url("/api/batches")).json(batch))
            .await
    }

    pub async fn save_last_sku(&self, value: &str) -> Result<(), ClientError> {
        let body = LastSkuWrite {
            value: value.to_string(),
        };
        let _: OkResponse = self
            .send(
                self.http
                    .post(self.url("/api/batches"))
                    .query(&[("lastSku", "1")])
                    .json(&body),
            )
            .await?;
        Ok(())
    }

    pub async fn assign(&self, sku: &str, files: Vec<String>) -> Result<AssignResponse, ClientError> {
        let body = AssignRequest {
            sku: sku.to_string(),
            files,
        };
        self.send(self.http.post(self.url("/api/batches/assign")).json(&body))
            .await
    }
}
