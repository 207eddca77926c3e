#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User picked files for upload; one batch per message.
    FilesAdded { files: Vec<crate::NewFile> },
    /// Byte progress for a whole in-flight batch. The wire format exposes
    /// no per-file counts within one multipart body, so every entry of the
    /// batch receives the same percentage.
    TransferProgress {
        batch: crate::BatchId,
        percentage: u8,
    },
    /// The batch transfer succeeded; per-file metadata in submission order.
    TransferDelivered {
        batch: crate::BatchId,
        files: Vec<crate::RemoteFile>,
    },
    /// The batch transfer failed or was cancelled.
    TransferFailed {
        batch: crate::BatchId,
        message: String,
    },
    /// UI asked to track server-side processing for an entry.
    PollingRequested { index: usize },
    /// One successful progress query for a polled file.
    PollUpdate {
        index: usize,
        file_id: crate::FileId,
        percentage: u8,
        phase: crate::ServerPhase,
    },
    /// The poller ran out of consecutive-failure retries for a file.
    PollExhausted {
        index: usize,
        file_id: crate::FileId,
        message: String,
    },
    /// User removed one entry.
    FileRemoved { index: usize },
    /// User cleared the whole session.
    FilesCleared,
}
