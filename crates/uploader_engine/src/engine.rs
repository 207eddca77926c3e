use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use client_logging::{client_error, client_info};
use tokio_util::sync::CancellationToken;

use crate::config::ApiConfig;
use crate::poll::poll_progress;
use crate::transport::ApiClient;
use crate::types::{ApiError, BatchId, EngineEvent};
use crate::upload::{upload_batch, ProgressSink, UploadSource};

enum EngineCommand {
    Upload {
        batch: BatchId,
        sources: Vec<UploadSource>,
    },
    CancelBatch {
        batch: BatchId,
    },
    StartPoll {
        index: usize,
        file_id: String,
    },
    StopPoll {
        file_id: String,
    },
}

/// Handle to the engine thread: commands in, events out.
///
/// The thread owns a tokio runtime; transfers and poll loops run as tasks
/// on it and report back through the event channel.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let client = ApiClient::new(config)?;

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    client_error!("engine runtime failed to start: {err}");
                    return;
                }
            };
            let mut engine = EngineLoop::new(client, event_tx);
            while let Ok(command) = cmd_rx.recv() {
                engine.handle(&runtime, command);
            }
        });

        Ok(Self { cmd_tx, event_rx })
    }

    /// Submit one batch transfer; progress and settlement come back as
    /// events carrying the batch id.
    pub fn upload(&self, batch: BatchId, sources: Vec<UploadSource>) {
        let _ = self.cmd_tx.send(EngineCommand::Upload { batch, sources });
    }

    /// Abort a batch's in-flight transfer. The handle is shared, so every
    /// file of the batch stops together.
    pub fn cancel_batch(&self, batch: BatchId) {
        let _ = self.cmd_tx.send(EngineCommand::CancelBatch { batch });
    }

    /// Start the polling loop for a file's server-side processing status.
    pub fn start_poll(&self, index: usize, file_id: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::StartPoll {
            index,
            file_id: file_id.into(),
        });
    }

    /// Cancel a polling loop; it stops at its next tick.
    pub fn stop_poll(&self, file_id: &str) {
        let _ = self.cmd_tx.send(EngineCommand::StopPoll {
            file_id: file_id.to_owned(),
        });
    }

    /// Non-blocking drain of the next engine event, if any.
    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }
}

struct PollHandle {
    generation: u64,
    token: CancellationToken,
}

/// State owned by the engine thread. Both token arenas live here, not in
/// ambient globals; teardown happens in exactly one place per handle.
struct EngineLoop {
    client: ApiClient,
    event_tx: mpsc::Sender<EngineEvent>,
    /// One shared cancellation handle per in-flight batch, removed
    /// exactly once: on settlement or on the first cancel.
    batch_tokens: Arc<Mutex<HashMap<BatchId, CancellationToken>>>,
    /// One polling loop per file id; a later `StartPoll` for the same id
    /// supersedes the running loop.
    poll_tokens: Arc<Mutex<HashMap<String, PollHandle>>>,
    next_poll_generation: u64,
}

impl EngineLoop {
    fn new(client: ApiClient, event_tx: mpsc::Sender<EngineEvent>) -> Self {
        Self {
            client,
            event_tx,
            batch_tokens: Arc::new(Mutex::new(HashMap::new())),
            poll_tokens: Arc::new(Mutex::new(HashMap::new())),
            next_poll_generation: 0,
        }
    }

    fn handle(&mut self, runtime: &tokio::runtime::Runtime, command: EngineCommand) {
        match command {
            EngineCommand::Upload { batch, sources } => {
                client_info!("batch {batch}: uploading {} file(s)", sources.len());
                let token = CancellationToken::new();
                self.batch_tokens
                    .lock()
                    .expect("batch token arena")
                    .insert(batch, token.clone());

                let client = self.client.clone();
                let event_tx = self.event_tx.clone();
                let tokens = Arc::clone(&self.batch_tokens);
                let sink: Arc<dyn ProgressSink> = Arc::new(BatchProgressSink {
                    batch,
                    tx: self.event_tx.clone(),
                });
                runtime.spawn(async move {
                    let result = upload_batch(&client, sources, sink, token).await;
                    tokens.lock().expect("batch token arena").remove(&batch);
                    let _ = event_tx.send(EngineEvent::TransferSettled { batch, result });
                });
            }
            EngineCommand::CancelBatch { batch } => {
                if let Some(token) = self
                    .batch_tokens
                    .lock()
                    .expect("batch token arena")
                    .remove(&batch)
                {
                    client_info!("batch {batch}: cancelling transfer");
                    token.cancel();
                }
            }
            EngineCommand::StartPoll { index, file_id } => {
                let token = CancellationToken::new();
                self.next_poll_generation += 1;
                let generation = self.next_poll_generation;
                {
                    let mut polls = self.poll_tokens.lock().expect("poll token arena");
                    if let Some(previous) = polls.insert(
                        file_id.clone(),
                        PollHandle {
                            generation,
                            token: token.clone(),
                        },
                    ) {
                        previous.token.cancel();
                    }
                }

                let client = self.client.clone();
                let event_tx = self.event_tx.clone();
                let polls = Arc::clone(&self.poll_tokens);
                let interval = self.client.config().poll_interval;
                let max_retries = self.client.config().max_poll_retries;
                runtime.spawn(async move {
                    poll_progress(
                        &client,
                        index,
                        file_id.clone(),
                        interval,
                        max_retries,
                        event_tx,
                        token,
                    )
                    .await;
                    let mut polls = polls.lock().expect("poll token arena");
                    let finished = polls
                        .get(&file_id)
                        .is_some_and(|handle| handle.generation == generation);
                    if finished {
                        polls.remove(&file_id);
                    }
                });
            }
            EngineCommand::StopPoll { file_id } => {
                if let Some(handle) = self
                    .poll_tokens
                    .lock()
                    .expect("poll token arena")
                    .remove(&file_id)
                {
                    handle.token.cancel();
                }
            }
        }
    }
}

/// Forwards streamed-byte percentages into the event channel, stamped
/// with the batch they belong to.
struct BatchProgressSink {
    batch: BatchId,
    tx: mpsc::Sender<EngineEvent>,
}

impl ProgressSink for BatchProgressSink {
    fn emit(&self, percentage: u8) {
        let _ = self.tx.send(EngineEvent::TransferProgress {
            batch: self.batch,
            percentage,
        });
    }
}
