#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Submit one multipart transfer for the whole batch.
    SubmitBatch {
        batch: crate::BatchId,
        files: Vec<crate::NewFile>,
    },
    /// Abort the batch's in-flight transfer. The handle is shared, so
    /// every file of the batch stops together.
    CancelBatch { batch: crate::BatchId },
    /// Spawn a polling loop for a file's server-side processing status.
    StartPolling {
        index: usize,
        file_id: crate::FileId,
    },
    /// Tear down the polling loop for a file id; its next tick observes
    /// the cancellation.
    StopPolling { file_id: crate::FileId },
    /// Surface a user-facing notification.
    Notify { severity: Severity, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}
