use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;

use crate::view_model::{FileRowView, UploadViewModel};

pub type BatchId = u64;
pub type FileId = String;

/// Lifecycle status of a tracked file, spanning the byte-transfer phase
/// and the server-processing phase.
///
/// Byte phase: `Uploading -> {Success, Error}`. After a successful
/// handoff the poller may move the entry back through `Uploading`
/// (server-side processing) into `Completed`, `Failed`, `Error`
/// (polling exhausted) or `Stalled` (unrecognized server status).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    Uploading,
    Success,
    Error,
    Completed,
    Failed,
    Stalled,
}

impl EntryStatus {
    /// Lowercase label, the form surfaced to the UI layer.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Uploading => "uploading",
            EntryStatus::Success => "success",
            EntryStatus::Error => "error",
            EntryStatus::Completed => "completed",
            EntryStatus::Failed => "failed",
            EntryStatus::Stalled => "stalled",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptor for a file being added to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

/// Server-side description of an uploaded file, as reconciled into an
/// entry after a successful transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFile {
    pub id: FileId,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub metadata: Option<Value>,
}

/// Server-reported processing phase for a polled file, normalized
/// case-insensitively by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerPhase {
    Uploading,
    Completed,
    Failed,
    Other(String),
}

/// One tracked file in the session.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub upload_progress: u8,
    pub status: EntryStatus,
    pub id: Option<FileId>,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub metadata: Option<Value>,
    pub error: Option<String>,
    /// Links the entry to its batch-level cancellation handle while the
    /// transfer is in flight; cleared when the transfer settles.
    pub(crate) batch: Option<BatchId>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    base_url: String,
    files: Vec<TrackedFile>,
    /// Batches whose transfer has not settled yet. A batch stays active
    /// across removals of its entries; only settlement retires it.
    active_batches: BTreeSet<BatchId>,
    next_batch: BatchId,
    dirty: bool,
}

impl AppState {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn view(&self) -> UploadViewModel {
        UploadViewModel {
            files: self.files.iter().map(FileRowView::from_entry).collect(),
            is_uploading: !self.active_batches.is_empty(),
            dirty: self.dirty,
        }
    }

    pub fn files(&self) -> &[TrackedFile] {
        &self.files
    }

    /// Returns the dirty flag and resets it. The shell uses this to
    /// coalesce rendering.
    pub fn consume_dirty(&mut self) -> bool {
        let was_dirty = self.dirty;
        self.dirty = false;
        was_dirty
    }

    pub(crate) fn is_batch_active(&self, batch: BatchId) -> bool {
        self.active_batches.contains(&batch)
    }

    /// Append one batch of entries, all `Uploading` at progress 0, sharing
    /// a single cancellation handle slot.
    pub(crate) fn add_batch(&mut self, files: Vec<NewFile>) -> BatchId {
        self.next_batch += 1;
        let batch = self.next_batch;
        self.active_batches.insert(batch);
        for file in files {
            self.files.push(TrackedFile {
                name: file.name,
                size: file.size,
                mime_type: file.mime_type,
                upload_progress: 0,
                status: EntryStatus::Uploading,
                id: None,
                url: None,
                thumbnail_url: None,
                metadata: None,
                error: None,
                batch: Some(batch),
            });
        }
        self.dirty = true;
        batch
    }

    /// Apply one byte-progress percentage to every entry of the batch.
    /// Progress is monotone during the transfer phase.
    pub(crate) fn apply_batch_progress(&mut self, batch: BatchId, percentage: u8) {
        let percentage = percentage.min(100);
        let mut changed = false;
        for entry in self.batch_entries_mut(batch) {
            if percentage > entry.upload_progress {
                entry.upload_progress = percentage;
                changed = true;
            }
        }
        if changed {
            self.dirty = true;
        }
    }

    /// Reconcile server-returned metadata into the batch, positionally:
    /// the i-th returned file updates the i-th surviving batch entry.
    /// Entries past the end of the response keep their transfer state.
    pub(crate) fn reconcile_batch(&mut self, batch: BatchId, remote: Vec<RemoteFile>) {
        self.active_batches.remove(&batch);
        let base = self.base_url.clone();
        let mut remote = remote.into_iter();
        for entry in self.batch_entries_mut(batch) {
            if let Some(meta) = remote.next() {
                entry.id = Some(meta.id);
                entry.url = meta.url.map(|url| absolutize_url(&base, &url));
                entry.thumbnail_url = meta.thumbnail_url.map(|url| format!("{base}{url}"));
                entry.metadata = meta.metadata;
                entry.upload_progress = 100;
                entry.status = EntryStatus::Success;
            }
            entry.batch = None;
        }
        self.dirty = true;
    }

    /// Mark every entry of the batch as failed with a shared message.
    pub(crate) fn fail_batch(&mut self, batch: BatchId, message: &str) {
        self.active_batches.remove(&batch);
        for entry in self.batch_entries_mut(batch) {
            entry.upload_progress = 100;
            entry.status = EntryStatus::Error;
            entry.error = Some(message.to_owned());
            entry.batch = None;
        }
        self.dirty = true;
    }

    pub(crate) fn entry_file_id(&self, index: usize) -> Option<FileId> {
        self.files.get(index).and_then(|entry| entry.id.clone())
    }

    /// Fetch an entry for a poll-side mutation, verifying it still exists
    /// at the captured index and still carries the polled file id. A
    /// removed or shifted entry yields `None` and the poll result is
    /// discarded.
    pub(crate) fn poll_entry_mut(
        &mut self,
        index: usize,
        file_id: &str,
    ) -> Option<&mut TrackedFile> {
        let matches = self
            .files
            .get(index)
            .is_some_and(|entry| entry.id.as_deref() == Some(file_id));
        if !matches {
            return None;
        }
        self.dirty = true;
        self.files.get_mut(index)
    }

    /// Splice one entry out of the collection. Later indices shift down;
    /// poll events carry the file id so stale indices are detected.
    pub(crate) fn remove_entry(&mut self, index: usize) -> Option<TrackedFile> {
        if index >= self.files.len() {
            return None;
        }
        self.dirty = true;
        Some(self.files.remove(index))
    }

    /// Drop every entry. Active batches stay registered until their
    /// transfers settle, which keeps `is_uploading` truthful while aborts
    /// propagate.
    pub(crate) fn clear_entries(&mut self) -> Vec<TrackedFile> {
        if self.files.is_empty() {
            return Vec::new();
        }
        self.dirty = true;
        std::mem::take(&mut self.files)
    }

    fn batch_entries_mut(&mut self, batch: BatchId) -> impl Iterator<Item = &mut TrackedFile> + '_ {
        self.files
            .iter_mut()
            .filter(move |entry| entry.batch == Some(batch))
    }
}

/// The server may hand back relative paths; prefix them with the API
/// base unless they are already absolute.
fn absolutize_url(base: &str, url: &str) -> String {
    if url.starts_with("http") {
        url.to_owned()
    } else {
        format!("{base}{url}")
    }
}
