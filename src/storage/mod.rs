pub mod cloudinary;
pub mod vercel_blob;

use crate::config::StorageConfig;
use thiserror::Error;

pub use cloudinary::CloudinaryStore;
pub use vercel_blob::BlobStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("missing storage credentials: {0}")]
    MissingCredentials(&'static str),
    #[error("request failed: {0}")]
    Request(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// One file as received from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.map(str::to_string),
            bytes,
        }
    }
}

/// Where an uploaded file ended up. `id` is what [`FileStore::delete`] takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub url: String,
    pub id: String,
}

#[derive(Clone)]
pub enum FileStore {
    Cloudinary(CloudinaryStore),
    VercelBlob(BlobStore),
    Unconfigured,
}

impl FileStore {
    pub fn from_config(config: &StorageConfig) -> Self {
        match config {
            StorageConfig::Cloudinary(cfg) => FileStore::Cloudinary(CloudinaryStore::new(cfg.clone())),
            StorageConfig::VercelBlob(cfg) => FileStore::VercelBlob(BlobStore::new(cfg.clone())),
            StorageConfig::Unconfigured => FileStore::Unconfigured,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            FileStore::Cloudinary(_) => "cloudinary",
            FileStore::VercelBlob(_) => "vercel_blob",
            FileStore::Unconfigured => "unconfigured",
        }
    }

    pub async fn store(&self, file: &UploadFile) -> Result<StoredFile, StorageError> {
        match self {
            FileStore::Cloudinary(store) => store.upload(file).await,
            FileStore::VercelBlob(store) => store.put(file).await,
            FileStore::Unconfigured => Err(StorageError::MissingCredentials("no storage backend")),
        }
    }

    pub async fn delete(&self, id: &str) -> Result<(), StorageError> {
        match self {
            FileStore::Cloudinary(store) => store.destroy(id).await,
            FileStore::VercelBlob(store) => store.delete(id).await,
            FileStore::Unconfigured => Err(StorageError::MissingCredentials("no storage backend")),
        }
    }
}

/// Keeps ASCII letters, digits, `.`, `-` and `_`; everything else becomes `-`.
pub(crate) fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '-' || c == '.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}
