use std::collections::BTreeSet;

use crate::{AppState, Effect, EntryStatus, Msg, ServerPhase, Severity};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FilesAdded { files } => {
            if files.is_empty() {
                return (state, Vec::new());
            }
            let batch = state.add_batch(files.clone());
            vec![Effect::SubmitBatch { batch, files }]
        }
        Msg::TransferProgress { batch, percentage } => {
            state.apply_batch_progress(batch, percentage);
            Vec::new()
        }
        Msg::TransferDelivered { batch, files } => {
            if !state.is_batch_active(batch) {
                return (state, Vec::new());
            }
            state.reconcile_batch(batch, files);
            vec![Effect::Notify {
                severity: Severity::Success,
                message: "Files uploaded".to_string(),
            }]
        }
        Msg::TransferFailed { batch, message } => {
            if !state.is_batch_active(batch) {
                return (state, Vec::new());
            }
            state.fail_batch(batch, &message);
            vec![Effect::Notify {
                severity: Severity::Error,
                message,
            }]
        }
        Msg::PollingRequested { index } => match state.entry_file_id(index) {
            Some(file_id) => vec![Effect::StartPolling { index, file_id }],
            // Entries without a server id have nothing to poll.
            None => Vec::new(),
        },
        Msg::PollUpdate {
            index,
            file_id,
            percentage,
            phase,
        } => apply_poll_update(&mut state, index, &file_id, percentage, phase),
        Msg::PollExhausted {
            index,
            file_id,
            message,
        } => match state.poll_entry_mut(index, &file_id) {
            Some(entry) => {
                entry.status = EntryStatus::Error;
                entry.error = Some(message.clone());
                let name = entry.name.clone();
                vec![Effect::Notify {
                    severity: Severity::Error,
                    message: format!("{name}: {message}"),
                }]
            }
            None => Vec::new(),
        },
        Msg::FileRemoved { index } => match state.remove_entry(index) {
            Some(removed) => {
                let mut effects = Vec::new();
                if let Some(batch) = removed.batch {
                    effects.push(Effect::CancelBatch { batch });
                }
                if let Some(file_id) = removed.id {
                    effects.push(Effect::StopPolling { file_id });
                }
                effects
            }
            None => Vec::new(),
        },
        Msg::FilesCleared => {
            let removed = state.clear_entries();
            let mut effects = Vec::new();
            let mut cancelled = BTreeSet::new();
            for entry in &removed {
                if let Some(batch) = entry.batch {
                    if cancelled.insert(batch) {
                        effects.push(Effect::CancelBatch { batch });
                    }
                }
            }
            for entry in removed {
                if let Some(file_id) = entry.id {
                    effects.push(Effect::StopPolling { file_id });
                }
            }
            effects
        }
    };

    (state, effects)
}

/// Reconcile one successful progress query into the entry, provided the
/// entry still exists at the captured index with the polled id.
fn apply_poll_update(
    state: &mut AppState,
    index: usize,
    file_id: &str,
    percentage: u8,
    phase: ServerPhase,
) -> Vec<Effect> {
    let Some(entry) = state.poll_entry_mut(index, file_id) else {
        return Vec::new();
    };
    match phase {
        ServerPhase::Uploading => {
            entry.upload_progress = percentage.min(100);
            entry.status = EntryStatus::Uploading;
            Vec::new()
        }
        ServerPhase::Completed => {
            entry.upload_progress = 100;
            entry.status = EntryStatus::Completed;
            let name = entry.name.clone();
            vec![Effect::Notify {
                severity: Severity::Success,
                message: format!("{name} uploaded"),
            }]
        }
        ServerPhase::Failed => {
            entry.upload_progress = 100;
            entry.status = EntryStatus::Failed;
            entry.error = Some("upload failed".to_string());
            let name = entry.name.clone();
            vec![Effect::Notify {
                severity: Severity::Error,
                message: format!("{name} failed"),
            }]
        }
        // Unmapped server status: park the entry instead of looping or
        // silently dropping it. Needs product-owner clarification.
        ServerPhase::Other(raw) => {
            entry.status = EntryStatus::Stalled;
            entry.error = Some(format!("unrecognized server status: {raw}"));
            Vec::new()
        }
    }
}
