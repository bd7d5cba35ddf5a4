use crate::config::CloudinaryConfig;
use crate::http::build_client;
use crate::metrics::UpstreamTimer;
use crate::storage::{StorageError, StoredFile, UploadFile, sanitize_file_name};
use chrono::Utc;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct CloudinaryStore {
    http: Client,
    config: CloudinaryConfig,
}

struct Credentials<'a> {
    cloud_name: &'a str,
    api_key: &'a str,
    api_secret: &'a str,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            http: build_client(),
            config,
        }
    }

    fn credentials(&self) -> Result<Credentials<'_>, StorageError> {
        let cloud_name = self
            .config
            .cloud_name
            .as_deref()
            .ok_or(StorageError::MissingCredentials("CLOUDINARY_CLOUD_NAME"))?;
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(StorageError::MissingCredentials("CLOUDINARY_API_KEY"))?;
        let api_secret = self
            .config
            .api_secret
            .as_deref()
            .ok_or(StorageError::MissingCredentials("CLOUDINARY_API_SECRET"))?;
        Ok(Credentials {
            cloud_name,
            api_key,
            api_secret,
        })
    }

    fn endpoint(&self, cloud_name: &str, action: &str) -> String {
        format!(
            "{}/{}/image/{}",
            self.config.base_url.trim_end_matches('/'),
            cloud_name,
            action
        )
    }

    /// Signed image upload; returns the HTTPS delivery URL and the public id.
    pub async fn upload(&self, file: &UploadFile) -> Result<StoredFile, StorageError> {
        let creds = self.credentials()?;
        let mut params = BTreeMap::new();
        params.insert("timestamp", Utc::now().timestamp().to_string());
        if let Some(folder) = &self.config.folder {
            params.insert("folder", folder.clone());
        }
        let signature = sign(&params, creds.api_secret);

        let mut part = Part::bytes(file.bytes.clone()).file_name(sanitize_file_name(&file.file_name));
        if let Some(content_type) = &file.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|err| StorageError::Request(err.to_string()))?;
        }
        let mut form = Form::new()
            .part("file", part)
            .text("api_key", creds.api_key.to_string())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in params {
            form = form.text(key, value);
        }

        let timer = UpstreamTimer::start("cloudinary");
        let response = self
            .http
            .post(self.endpoint(creds.cloud_name, "upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|err| StorageError::Request(err.to_string()))?;
        let status = response.status();
        timer.finish(status.is_success());
        if !status.is_success() {
            return Err(StorageError::Request(format!("HTTP {status}")));
        }
        let payload: UploadResponse = response
            .json()
            .await
            .map_err(|err| StorageError::InvalidResponse(err.to_string()))?;
        debug!(target = "crosslist.storage", public_id = %payload.public_id, "cloudinary_uploaded");
        Ok(StoredFile {
            url: payload.secure_url,
            id: payload.public_id,
        })
    }

    pub async fn destroy(&self, public_id: &str) -> Result<(), StorageError> {
        let creds = self.credentials()?;
        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());
        params.insert("timestamp", Utc::now().timestamp().to_string());
        let signature = sign(&params, creds.api_secret);

        let mut form: Vec<(&str, String)> = params.into_iter().collect();
        form.push(("api_key", creds.api_key.to_string()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", "sha256".to_string()));

        let response = self
            .http
            .post(self.endpoint(creds.cloud_name, "destroy"))
            .form(&form)
            .send()
            .await
            .map_err(|err| StorageError::Request(err.to_string()))?;
        if !response.status().is_success() {
            return Err(StorageError::Request(format!("HTTP {}", response.status())));
        }
        let payload: DestroyResponse = response
            .json()
            .await
            .map_err(|err| StorageError::InvalidResponse(err.to_string()))?;
        if payload.result != "ok" {
            warn!(target = "crosslist.storage", public_id, result = %payload.result, "cloudinary_destroy_noop");
        }
        Ok(())
    }
}

/// Cloudinary request signature: sorted `key=value` pairs joined by `&`, the
/// API secret appended, hashed with SHA-256.
fn sign(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let joined = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    Sha256::digest(format!("{joined}{api_secret}").as_bytes())
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
