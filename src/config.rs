use std::env;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_FINDING_URL: &str = "https://svcs.ebay.com/services/search/FindingService/v1";
pub const DEFAULT_CLOUDINARY_BASE_URL: &str = "https://api.cloudinary.com/v1_1";
pub const DEFAULT_BLOB_API_URL: &str = "https://blob.vercel-storage.com";
pub const DEFAULT_COMPS_WINDOW_DAYS: i64 = 90;
pub const MAX_COMPS_WINDOW_DAYS: i64 = 365;

/// Runtime settings, read once at startup. Credentials stay optional here and
/// are checked by each request that needs them.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub request_max_bytes: usize,
    pub redis_url: Option<String>,
    pub vision: VisionConfig,
    pub finding: FindingConfig,
    pub storage: StorageConfig,
    pub metrics_key: Option<String>,
    pub openapi_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub mock_mode: bool,
}

#[derive(Debug, Clone)]
pub struct FindingConfig {
    pub app_id: Option<String>,
    pub endpoint: String,
    pub window_days: i64,
    pub entries_per_page: u32,
}

#[derive(Debug, Clone)]
pub enum StorageConfig {
    Cloudinary(CloudinaryConfig),
    VercelBlob(BlobConfig),
    Unconfigured,
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub folder: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct BlobConfig {
    pub token: Option<String>,
    pub base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(8000),
            request_max_bytes: env::var("REQUEST_MAX_BYTES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(12 * 1024 * 1024),
            redis_url: non_empty("REDIS_URL"),
            vision: VisionConfig::from_env(),
            finding: FindingConfig::from_env(),
            storage: StorageConfig::from_env(),
            metrics_key: non_empty("METRICS_KEY"),
            openapi_key: non_empty("OPENAPI_KEY"),
        }
    }

    /// Settings with every credential missing and the in-memory store; the
    /// base for tests that inject their own upstream endpoints.
    pub fn offline() -> Self {
        Self {
            port: 0,
            request_max_bytes: 12 * 1024 * 1024,
            redis_url: None,
            vision: VisionConfig {
                api_key: None,
                base_url: DEFAULT_OPENAI_BASE_URL.into(),
                model: DEFAULT_OPENAI_MODEL.into(),
                mock_mode: false,
            },
            finding: FindingConfig {
                app_id: None,
                endpoint: DEFAULT_FINDING_URL.into(),
                window_days: DEFAULT_COMPS_WINDOW_DAYS,
                entries_per_page: 25,
            },
            storage: StorageConfig::Unconfigured,
            metrics_key: None,
            openapi_key: None,
        }
    }
}

impl VisionConfig {
    fn from_env() -> Self {
        Self {
            api_key: non_empty("OPENAI_API_KEY"),
            base_url: non_empty("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.into()),
            model: non_empty("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.into()),
            mock_mode: parse_env_bool("LISTING_MOCK_MODE"),
        }
    }
}

impl FindingConfig {
    fn from_env() -> Self {
        Self {
            app_id: non_empty("EBAY_APP_ID"),
            endpoint: non_empty("EBAY_FINDING_URL").unwrap_or_else(|| DEFAULT_FINDING_URL.into()),
            window_days: comps_window_days(env::var("COMPS_WINDOW_DAYS").ok().as_deref()),
            entries_per_page: env::var("COMPS_ENTRIES_PER_PAGE")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|v| (1..=100).contains(v))
                .unwrap_or(25),
        }
    }
}

impl StorageConfig {
    fn from_env() -> Self {
        let cloudinary = CloudinaryConfig {
            cloud_name: non_empty("CLOUDINARY_CLOUD_NAME"),
            api_key: non_empty("CLOUDINARY_API_KEY"),
            api_secret: non_empty("CLOUDINARY_API_SECRET"),
            folder: non_empty("CLOUDINARY_FOLDER"),
            base_url: non_empty("CLOUDINARY_BASE_URL")
                .unwrap_or_else(|| DEFAULT_CLOUDINARY_BASE_URL.into()),
        };
        let blob = BlobConfig {
            token: non_empty("BLOB_READ_WRITE_TOKEN"),
            base_url: non_empty("BLOB_API_URL").unwrap_or_else(|| DEFAULT_BLOB_API_URL.into()),
        };

        match non_empty("STORAGE_BACKEND")
            .map(|v| v.to_lowercase())
            .as_deref()
        {
            Some("cloudinary") => StorageConfig::Cloudinary(cloudinary),
            Some("vercel_blob") | Some("blob") | Some("vercel") => StorageConfig::VercelBlob(blob),
            _ if cloudinary.cloud_name.is_some() => StorageConfig::Cloudinary(cloudinary),
            _ if blob.token.is_some() => StorageConfig::VercelBlob(blob),
            _ => StorageConfig::Unconfigured,
        }
    }
}

pub fn parse_env_bool(key: &str) -> bool {
    match env::var(key) {
        Ok(value) => matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => false,
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Sold-item window in days: positive, capped at a year, 90 when unset.
fn comps_window_days(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .map(|v| v.min(MAX_COMPS_WINDOW_DAYS))
        .unwrap_or(DEFAULT_COMPS_WINDOW_DAYS)
}
