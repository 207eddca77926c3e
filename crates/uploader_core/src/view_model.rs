use crate::{EntryStatus, TrackedFile};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UploadViewModel {
    pub files: Vec<FileRowView>,
    pub is_uploading: bool,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileRowView {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub upload_progress: u8,
    pub status: EntryStatus,
    pub id: Option<String>,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub error: Option<String>,
}

impl FileRowView {
    pub(crate) fn from_entry(entry: &TrackedFile) -> Self {
        Self {
            name: entry.name.clone(),
            size: entry.size,
            mime_type: entry.mime_type.clone(),
            upload_progress: entry.upload_progress,
            status: entry.status.clone(),
            id: entry.id.clone(),
            url: entry.url.clone(),
            thumbnail_url: entry.thumbnail_url.clone(),
            error: entry.error.clone(),
        }
    }
}
