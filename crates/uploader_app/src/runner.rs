use std::collections::VecDeque;

use client_logging::{client_error, client_info};
use uploader_core::{Effect, Msg, RemoteFile, ServerPhase, Severity};
use uploader_engine::{EngineEvent, EngineHandle, RemoteFileMeta, ServerStatus, UploadSource};

/// Bridges core effects to engine commands and engine events back to
/// core messages.
pub struct EffectRunner {
    engine: EngineHandle,
    /// Payloads for batches dispatched but not yet submitted, in the
    /// order their `FilesAdded` messages were applied.
    staged: VecDeque<Vec<UploadSource>>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self {
            engine,
            staged: VecDeque::new(),
        }
    }

    /// Queue the byte payloads for the next `FilesAdded` dispatch; the
    /// resulting `SubmitBatch` effect picks them up in order.
    pub fn stage_payloads(&mut self, sources: Vec<UploadSource>) {
        self.staged.push_back(sources);
    }

    pub fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SubmitBatch { batch, files } => match self.staged.pop_front() {
                    Some(sources) => {
                        client_info!("SubmitBatch batch={} files={}", batch, files.len());
                        self.engine.upload(batch, sources);
                    }
                    None => {
                        client_error!("SubmitBatch batch={batch} had no staged payloads");
                    }
                },
                Effect::CancelBatch { batch } => self.engine.cancel_batch(batch),
                Effect::StartPolling { index, file_id } => {
                    self.engine.start_poll(index, file_id);
                }
                Effect::StopPolling { file_id } => self.engine.stop_poll(&file_id),
                Effect::Notify { severity, message } => notify(severity, &message),
            }
        }
    }

    /// Drain pending engine events into core messages.
    pub fn drain_events(&mut self) -> Vec<Msg> {
        let mut msgs = Vec::new();
        while let Some(event) = self.engine.try_recv() {
            msgs.push(map_event(event));
        }
        msgs
    }
}

fn notify(severity: Severity, message: &str) {
    match severity {
        Severity::Success => println!("ok: {message}"),
        Severity::Error => println!("error: {message}"),
    }
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::TransferProgress { batch, percentage } => {
            Msg::TransferProgress { batch, percentage }
        }
        EngineEvent::TransferSettled { batch, result } => match result {
            Ok(files) => Msg::TransferDelivered {
                batch,
                files: files.into_iter().map(map_remote).collect(),
            },
            Err(error) => Msg::TransferFailed {
                batch,
                message: error.message,
            },
        },
        EngineEvent::PollUpdate {
            index,
            file_id,
            percentage,
            status,
        } => Msg::PollUpdate {
            index,
            file_id,
            percentage,
            phase: map_phase(status),
        },
        EngineEvent::PollExhausted {
            index,
            file_id,
            error,
        } => Msg::PollExhausted {
            index,
            file_id,
            message: error.message,
        },
    }
}

fn map_remote(meta: RemoteFileMeta) -> RemoteFile {
    RemoteFile {
        id: meta.id,
        url: meta.url,
        thumbnail_url: meta.thumbnail_url,
        metadata: meta.metadata,
    }
}

fn map_phase(status: ServerStatus) -> ServerPhase {
    match status {
        ServerStatus::Uploading => ServerPhase::Uploading,
        ServerStatus::Completed => ServerPhase::Completed,
        ServerStatus::Failed => ServerPhase::Failed,
        ServerStatus::Other(raw) => ServerPhase::Other(raw),
    }
}
