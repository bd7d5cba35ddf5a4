use crate::models::Batch;
use crate::sku;
use once_cell::sync::Lazy;
use redis::AsyncCommands;
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const LAST_SKU_KEY: &str = "lastSku";
const BATCH_INDEX_KEY: &str = "batches";
const BATCH_KEY_PREFIX: &str = "batch:";

// KEYS: batch key, counter key, index key. ARGV: batch json, next sku, sku.
static ASSIGN_SCRIPT: Lazy<redis::Script> = Lazy::new(|| {
    redis::Script::new(
        r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
  return 0
end
redis.call('SET', KEYS[1], ARGV[1])
redis.call('SADD', KEYS[3], ARGV[3])
redis.call('SET', KEYS[2], ARGV[2])
return 1
"#,
    )
});

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("failed to encode batch: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("batch `{0}` already exists")]
    Exists(String),
}

/// Key/value persistence for batches and the SKU counter.
///
/// Independent writes are last-write-wins; only [`BatchStore::assign`] writes
/// the batch and the counter together.
#[derive(Clone)]
pub enum BatchStore {
    Redis(redis::Client),
    Memory(Arc<Mutex<MemoryState>>),
}

#[derive(Default)]
pub struct MemoryState {
    batches: HashMap<String, Batch>,
    last_sku: Option<String>,
}

impl BatchStore {
    pub fn from_url(url: Option<&str>) -> Result<Self, StoreError> {
        match url {
            Some(url) => Ok(BatchStore::Redis(redis::Client::open(url)?)),
            None => Ok(Self::memory()),
        }
    }

    pub fn memory() -> Self {
        BatchStore::Memory(Arc::new(Mutex::new(MemoryState::default())))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            BatchStore::Redis(_) => "redis",
            BatchStore::Memory(_) => "memory",
        }
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        if let BatchStore::Redis(client) = self {
            let mut conn = client.get_multiplexed_async_connection().await?;
            let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        }
        Ok(())
    }

    /// Every stored batch, ordered by SKU.
    pub async fn load_batches(&self) -> Result<Vec<Batch>, StoreError> {
        let mut batches: Vec<Batch> = match self {
            BatchStore::Memory(state) => state.lock().await.batches.values().cloned().collect(),
            BatchStore::Redis(client) => {
                let mut conn = client.get_multiplexed_async_connection().await?;
                let skus: Vec<String> = conn.smembers(BATCH_INDEX_KEY).await?;
                if skus.is_empty() {
                    Vec::new()
                } else {
                    let keys: Vec<String> = skus.iter().map(|s| batch_key(s)).collect();
                    let raw: Vec<Option<String>> = conn.mget(&keys).await?;
                    keys.iter()
                        .zip(raw)
                        .filter_map(|(key, value)| decode_batch(key, value?))
                        .collect()
                }
            }
        };
        batches.sort_by(|a, b| sku::compare(&a.sku, &b.sku));
        Ok(batches)
    }

    pub async fn load_batch(&self, sku: &str) -> Result<Option<Batch>, StoreError> {
        match self {
            BatchStore::Memory(state) => Ok(state.lock().await.batches.get(sku).cloned()),
            BatchStore::Redis(client) => {
                let mut conn = client.get_multiplexed_async_connection().await?;
                let key = batch_key(sku);
                let raw: Option<String> = conn.get(&key).await?;
                Ok(raw.and_then(|value| decode_batch(&key, value)))
            }
        }
    }

    pub async fn load_last_sku(&self) -> Result<Option<String>, StoreError> {
        match self {
            BatchStore::Memory(state) => Ok(state.lock().await.last_sku.clone()),
            BatchStore::Redis(client) => {
                let mut conn = client.get_multiplexed_async_connection().await?;
                let value: Option<String> = conn.get(LAST_SKU_KEY).await?;
                Ok(value)
            }
        }
    }

    /// Whole-value upsert keyed by `batch.sku`; no field-level merge.
    pub async fn save_batch(&self, batch: &Batch) -> Result<(), StoreError> {
        match self {
            BatchStore::Memory(state) => {
                state
                    .lock()
                    .await
                    .batches
                    .insert(batch.sku.clone(), batch.clone());
            }
            BatchStore::Redis(client) => {
                let json = serde_json::to_string(batch)?;
                let mut conn = client.get_multiplexed_async_connection().await?;
                let _: () = redis::pipe()
                    .atomic()
                    .set(batch_key(&batch.sku), json)
                    .ignore()
                    .sadd(BATCH_INDEX_KEY, &batch.sku)
                    .ignore()
                    .query_async(&mut conn)
                    .await?;
            }
        }
        debug!(target = "crosslist.store", sku = %batch.sku, status = ?batch.status, "batch_saved");
        Ok(())
    }

    pub async fn save_last_sku(&self, value: &str) -> Result<(), StoreError> {
        match self {
            BatchStore::Memory(state) => {
                state.lock().await.last_sku = Some(value.to_string());
            }
            BatchStore::Redis(client) => {
                let mut conn = client.get_multiplexed_async_connection().await?;
                let _: () = conn.set(LAST_SKU_KEY, value).await?;
            }
        }
        Ok(())
    }

    /// Creates `batch` and advances the counter to `next_sku` in one step.
    /// Fails with [`StoreError::Exists`] when the SKU is already taken, in
    /// which case nothing is written.
    pub async fn assign(&self, batch: &Batch, next_sku: &str) -> Result<(), StoreError> {
        match self {
            BatchStore::Memory(state) => {
                let mut guard = state.lock().await;
                if guard.batches.contains_key(&batch.sku) {
                    return Err(StoreError::Exists(batch.sku.clone()));
                }
                guard.batches.insert(batch.sku.clone(), batch.clone());
                guard.last_sku = Some(next_sku.to_string());
            }
            BatchStore::Redis(client) => {
                let json = serde_json::to_string(batch)?;
                let mut conn = client.get_multiplexed_async_connection().await?;
                let applied: i32 = ASSIGN_SCRIPT
                    .key(batch_key(&batch.sku))
                    .key(LAST_SKU_KEY)
                    .key(BATCH_INDEX_KEY)
                    .arg(json)
                    .arg(next_sku)
                    .arg(&batch.sku)
                    .invoke_async(&mut conn)
                    .await?;
                if applied == 0 {
                    return Err(StoreError::Exists(batch.sku.clone()));
                }
            }
        }
        debug!(target = "crosslist.store", sku = %batch.sku, next_sku, "batch_assigned");
        Ok(())
    }
}

fn batch_key(sku: &str) -> String {
    format!("{BATCH_KEY_PREFIX}{sku}")
}

fn decode_batch(key: &str, raw: String) -> Option<Batch> {
    match serde_json::from_str::<Batch>(&raw) {
        Ok(batch) => Some(batch),
        Err(err) => {
            warn!(target = "crosslist.store", key, error = %err, "stored_batch_unreadable");
            None
        }
    }
}
