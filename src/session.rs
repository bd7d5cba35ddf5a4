use crate::client::{ClientError, CrossListClient};
use crate::models::{Batch, CompsSummary};
use crate::sku::{self, DEFAULT_SKU, SkuError};
use crate::storage::UploadFile;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Most unassigned photos a session may hold at once.
pub const MAX_STAGED_IMAGES: usize = 24;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Sku(#[from] SkuError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("no batch `{0}` in this session")]
    UnknownBatch(String),
    #[error("batch `{0}` has no generated title yet")]
    NoDraft(String),
}

/// One uploaded photo as the session tracks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    /// Client-side handle for the original file; never persisted.
    pub local_ref: String,
    pub stored_url: String,
    pub storage_id: String,
    pub selected: bool,
    /// Set once by assignment, never cleared.
    pub assigned_sku: Option<String>,
}

impl ImageAsset {
    fn new(local_ref: String, stored_url: String, storage_id: String) -> Self {
        Self {
            local_ref,
            stored_url,
            storage_id,
            selected: false,
            assigned_sku: None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned_sku.is_some()
    }

    fn eligible(&self) -> bool {
        self.selected && !self.is_assigned()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadProgress {
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
}

impl UploadProgress {
    /// Share of the gesture already attempted, 0..=100.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let done = (self.completed + self.failed).min(self.total);
        ((done * 100) / self.total) as u8
    }

    pub fn is_done(&self) -> bool {
        self.completed + self.failed >= self.total
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignOutcome {
    Assigned(Batch),
    /// Nothing was both selected and unassigned; no request was made.
    NoSelection,
}

/// How many of `incoming` files fit next to `staged` unassigned photos.
pub fn intake_room(staged: usize) -> usize {
    MAX_STAGED_IMAGES.saturating_sub(staged)
}

/// Drops whatever would push the staging area past [`MAX_STAGED_IMAGES`].
pub fn plan_intake<T>(staged: usize, mut incoming: Vec<T>) -> Vec<T> {
    incoming.truncate(intake_room(staged));
    incoming
}

/// Client-side state for one user working through the listing workflow.
///
/// Mirrors what a single page would hold: the photos uploaded so far, a
/// cached copy of the stored batches, and the SKU the next assignment will
/// use. Every operation runs its backend calls one after another.
pub struct Session {
    client: CrossListClient,
    assets: Vec<ImageAsset>,
    batches: Vec<Batch>,
    current_sku: String,
    progress: UploadProgress,
}

impl Session {
    /// Reads the stored batches and SKU counter once.
    pub async fn load(client: CrossListClient) -> Result<Self, SessionError> {
        let batches = client.load_batches().await?;
        let current_sku = client
            .load_last_sku()
            .await?
            .unwrap_or_else(|| DEFAULT_SKU.to_string());
        info!(target = "crosslist.session", batches = batches.len(), sku = %current_sku, "session_loaded");
        Ok(Self {
            client,
            assets: Vec::new(),
            batches,
            current_sku,
            progress: UploadProgress::default(),
        })
    }

    pub fn client(&self) -> &CrossListClient {
        &self.client
    }

    pub fn assets(&self) -> &[ImageAsset] {
        &self.assets
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn batch(&self, sku: &str) -> Option<&Batch> {
        self.batches.iter().find(|b| b.sku == sku)
    }

    pub fn assets_for(&self, sku: &str) -> impl Iterator<Item = &ImageAsset> {
        self.assets
            .iter()
            .filter(move |a| a.assigned_sku.as_deref() == Some(sku))
    }

    pub fn current_sku(&self) -> &str {
        &self.current_sku
    }

    pub fn progress(&self) -> UploadProgress {
        self.progress
    }

    pub fn staged_count(&self) -> usize {
        self.assets.iter().filter(|a| !a.is_assigned()).count()
    }

    pub fn selected_count(&self) -> usize {
        self.assets.iter().filter(|a| a.eligible()).count()
    }

    pub fn intake_room(&self) -> usize {
        intake_room(self.staged_count())
    }

    /// Overrides the SKU the next assignment uses. Only the session changes;
    /// the stored counter moves on the next successful assignment.
    pub fn set_current_sku(&mut self, value: &str) -> Result<(), SessionError> {
        self.current_sku = sku::validate(value)?;
        Ok(())
    }

    pub async fn upload_files(&mut self, files: Vec<UploadFile>) -> UploadProgress {
        self.upload_files_with(files, |_| {}).await
    }

    /// Uploads what fits under the staging cap, one file at a time. A failed
    /// file is logged and skipped; `on_progress` sees every step.
    pub async fn upload_files_with<F>(&mut self, files: Vec<UploadFile>, mut on_progress: F) -> UploadProgress
    where
        F: FnMut(&UploadProgress),
    {
        let requested = files.len();
        let planned = plan_intake(self.staged_count(), files);
        if planned.len() < requested {
            warn!(target = "crosslist.session", requested, accepted = planned.len(), "intake_truncated");
        }

        self.progress = UploadProgress {
            completed: 0,
            failed: 0,
            total: planned.len(),
        };
        on_progress(&self.progress);

        for file in planned {
            match self.client.upload(&file).await {
                Ok(stored) => {
                    self.assets
                        .push(ImageAsset::new(file.file_name, stored.url, stored.id));
                    self.progress.completed += 1;
                }
                Err(err) => {
                    warn!(target = "crosslist.session", file = %file.file_name, error = %err, "upload_failed");
                    self.progress.failed += 1;
                }
            }
            on_progress(&self.progress);
        }
        self.progress
    }

    /// Flips selection on an unassigned photo. Returns the new state, or
    /// `false` when the id is unknown or already assigned.
    pub fn toggle(&mut self, storage_id: &str) -> bool {
        match self
            .assets
            .iter_mut()
            .find(|a| a.storage_id == storage_id && !a.is_assigned())
        {
            Some(asset) => {
                asset.selected = !asset.selected;
                asset.selected
            }
            None => false,
        }
    }

    pub fn select_all(&mut self) {
        for asset in self.assets.iter_mut().filter(|a| !a.is_assigned()) {
            asset.selected = true;
        }
    }

    pub fn clear_selection(&mut self) {
        for asset in &mut self.assets {
            asset.selected = false;
        }
    }

    /// Drops selected, unassigned photos and deletes them from storage.
    /// Deletion failures are logged; the photo leaves the session either way.
    pub async fn remove_selected(&mut self) -> usize {
        let (removed, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.assets).into_iter().partition(|a| a.eligible());
        self.assets = kept;
        for asset in &removed {
            if let Err(err) = self.client.delete_upload(&asset.storage_id).await {
                warn!(target = "crosslist.session", id = %asset.storage_id, error = %err, "storage_delete_failed");
            }
        }
        removed.len()
    }

    /// Groups the selected, unassigned photos under the current SKU.
    ///
    /// The batch and the advanced counter are written together; nothing in
    /// the session changes unless that write succeeds.
    pub async fn assign_sku(&mut self) -> Result<AssignOutcome, SessionError> {
        let files: Vec<String> = self
            .assets
            .iter()
            .filter(|a| a.eligible())
            .map(|a| a.stored_url.clone())
            .collect();
        if files.is_empty() {
            return Ok(AssignOutcome::NoSelection);
        }
        let sku = sku::validate(&self.current_sku)?;

        let response = self.client.assign(&sku, files).await?;
        for asset in self.assets.iter_mut().filter(|a| a.eligible()) {
            asset.assigned_sku = Some(sku.clone());
            asset.selected = false;
        }
        self.batches.push(response.batch.clone());
        self.current_sku = response.next_sku;
        info!(target = "crosslist.session", sku = %sku, next = %self.current_sku, "sku_assigned");
        Ok(AssignOutcome::Assigned(response.batch))
    }

    /// Drafts a listing for `sku`, stores the ready batch and replaces the
    /// cached copy. On failure the batch stays as it was.
    pub async fn generate_listing(&mut self, sku: &str) -> Result<Batch, SessionError> {
        let index = self
            .batches
            .iter()
            .position(|b| b.sku == sku)
            .ok_or_else(|| SessionError::UnknownBatch(sku.to_string()))?;

        let mut batch = self.batches[index].clone();
        let draft = self.client.generate_listing(&batch.sku, &batch.files).await?;
        batch.apply_draft(draft);
        let stored = self.client.save_batch(&batch).await?;
        debug!(target = "crosslist.session", sku = %stored.sku, "listing_saved");
        self.batches[index] = stored.clone();
        Ok(stored)
    }

    pub async fn find_comps(&self, title: &str) -> Result<CompsSummary, SessionError> {
        Ok(self.client.find_comps(title).await?)
    }

    /// Comparables for an assigned batch, searched by its drafted title.
    pub async fn find_comps_for(&self, sku: &str) -> Result<CompsSummary, SessionError> {
        let batch = self
            .batch(sku)
            .ok_or_else(|| SessionError::UnknownBatch(sku.to_string()))?;
        let title = batch
            .ai
            .as_ref()
            .map(|draft| draft.title.trim())
            .filter(|title| !title.is_empty())
            .ok_or_else(|| SessionError::NoDraft(sku.to_string()))?;
        self.find_comps(title).await
    }

    /// Replaces the cached batches with the stored ones.
    pub async fn refresh(&mut self) -> Result<(), SessionError> {
        self.batches = self.client.load_batches().await?;
        Ok(())
    }
}
