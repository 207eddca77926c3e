//! Uploader core: pure state machine for the upload session registry.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, Severity};
pub use msg::Msg;
pub use state::{
    AppState, BatchId, EntryStatus, FileId, NewFile, RemoteFile, ServerPhase, TrackedFile,
};
pub use update::update;
pub use view_model::{FileRowView, UploadViewModel};
