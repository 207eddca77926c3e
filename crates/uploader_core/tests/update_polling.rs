use std::sync::Once;

use uploader_core::{
    update, AppState, Effect, EntryStatus, Msg, NewFile, RemoteFile, ServerPhase, Severity,
};

const BASE: &str = "http://media.example.com/api/v1";

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(client_logging::initialize_for_tests);
}

/// One entry, delivered with the given server id, ready to poll.
fn delivered_state(id: &str) -> AppState {
    let state = AppState::new(BASE);
    let (state, _effects) = update(
        state,
        Msg::FilesAdded {
            files: vec![NewFile {
                name: "clip.mp4".to_string(),
                size: 10 * 1024 * 1024,
                mime_type: "video/mp4".to_string(),
            }],
        },
    );
    let (state, _effects) = update(
        state,
        Msg::TransferDelivered {
            batch: 1,
            files: vec![RemoteFile {
                id: id.to_string(),
                url: None,
                thumbnail_url: None,
                metadata: None,
            }],
        },
    );
    state
}

fn poll_update(file_id: &str, percentage: u8, phase: ServerPhase) -> Msg {
    Msg::PollUpdate {
        index: 0,
        file_id: file_id.to_string(),
        percentage,
        phase,
    }
}

#[test]
fn polling_request_resolves_the_entry_file_id() {
    init_logging();
    let state = delivered_state("f1");
    let (_state, effects) = update(state, Msg::PollingRequested { index: 0 });
    assert_eq!(
        effects,
        vec![Effect::StartPolling {
            index: 0,
            file_id: "f1".to_string(),
        }]
    );
}

#[test]
fn polling_request_without_a_server_id_is_ignored() {
    init_logging();
    let state = AppState::new(BASE);
    let (state, _effects) = update(
        state,
        Msg::FilesAdded {
            files: vec![NewFile {
                name: "a.png".to_string(),
                size: 1,
                mime_type: "image/png".to_string(),
            }],
        },
    );
    let (state, effects) = update(state, Msg::PollingRequested { index: 0 });
    assert!(effects.is_empty());
    let (_state, effects) = update(state, Msg::PollingRequested { index: 9 });
    assert!(effects.is_empty());
}

#[test]
fn server_side_progress_flows_through_to_completion() {
    init_logging();
    let state = delivered_state("f1");

    let (state, effects) = update(state, poll_update("f1", 40, ServerPhase::Uploading));
    assert!(effects.is_empty());
    let row = &state.view().files[0];
    assert_eq!(row.status, EntryStatus::Uploading);
    assert_eq!(row.upload_progress, 40);

    let (state, effects) = update(state, poll_update("f1", 97, ServerPhase::Completed));
    assert_eq!(
        effects,
        vec![Effect::Notify {
            severity: Severity::Success,
            message: "clip.mp4 uploaded".to_string(),
        }]
    );
    let row = &state.view().files[0];
    assert_eq!(row.status, EntryStatus::Completed);
    assert_eq!(row.upload_progress, 100);
}

#[test]
fn server_failure_is_terminal_with_forced_progress() {
    init_logging();
    let state = delivered_state("f1");

    let (state, effects) = update(state, poll_update("f1", 55, ServerPhase::Failed));
    assert_eq!(
        effects,
        vec![Effect::Notify {
            severity: Severity::Error,
            message: "clip.mp4 failed".to_string(),
        }]
    );
    let row = &state.view().files[0];
    assert_eq!(row.status, EntryStatus::Failed);
    assert_eq!(row.upload_progress, 100);
    assert_eq!(row.error.as_deref(), Some("upload failed"));
}

#[test]
fn unrecognized_server_status_parks_the_entry_as_stalled() {
    init_logging();
    let state = delivered_state("f1");

    let (state, _effects) = update(state, poll_update("f1", 60, ServerPhase::Uploading));
    let (state, effects) = update(
        state,
        poll_update("f1", 60, ServerPhase::Other("ARCHIVED".to_string())),
    );

    assert!(effects.is_empty());
    let row = &state.view().files[0];
    assert_eq!(row.status, EntryStatus::Stalled);
    assert_eq!(row.upload_progress, 60);
    assert_eq!(
        row.error.as_deref(),
        Some("unrecognized server status: ARCHIVED")
    );
}

#[test]
fn exhausted_polling_records_the_reason_and_keeps_progress() {
    init_logging();
    let state = delivered_state("f1");

    let (state, _effects) = update(state, poll_update("f1", 70, ServerPhase::Uploading));
    let (state, effects) = update(
        state,
        Msg::PollExhausted {
            index: 0,
            file_id: "f1".to_string(),
            message: "progress polling failed after 3 retries".to_string(),
        },
    );

    assert_eq!(
        effects,
        vec![Effect::Notify {
            severity: Severity::Error,
            message: "clip.mp4: progress polling failed after 3 retries".to_string(),
        }]
    );
    let row = &state.view().files[0];
    assert_eq!(row.status, EntryStatus::Error);
    assert_eq!(
        row.error.as_deref(),
        Some("progress polling failed after 3 retries")
    );
    // Exhaustion does not touch the last known percentage.
    assert_eq!(row.upload_progress, 70);
}

#[test]
fn poll_events_for_a_removed_entry_are_discarded() {
    init_logging();
    let state = delivered_state("f1");
    let (mut state, _effects) = update(state, Msg::FileRemoved { index: 0 });
    assert!(state.view().files.is_empty());
    state.consume_dirty();

    let (mut state, effects) = update(state, poll_update("f1", 90, ServerPhase::Completed));
    assert!(effects.is_empty());
    assert!(!state.consume_dirty());

    let (mut state, effects) = update(
        state,
        Msg::PollExhausted {
            index: 0,
            file_id: "f1".to_string(),
            message: "boom".to_string(),
        },
    );
    assert!(effects.is_empty());
    assert!(!state.consume_dirty());
}

#[test]
fn poll_events_for_a_shifted_index_are_discarded() {
    init_logging();
    let state = AppState::new(BASE);
    let (state, _effects) = update(
        state,
        Msg::FilesAdded {
            files: vec![
                NewFile {
                    name: "a.png".to_string(),
                    size: 1,
                    mime_type: "image/png".to_string(),
                },
                NewFile {
                    name: "b.png".to_string(),
                    size: 1,
                    mime_type: "image/png".to_string(),
                },
            ],
        },
    );
    let (state, _effects) = update(
        state,
        Msg::TransferDelivered {
            batch: 1,
            files: vec![
                RemoteFile {
                    id: "f1".to_string(),
                    url: None,
                    thumbnail_url: None,
                    metadata: None,
                },
                RemoteFile {
                    id: "f2".to_string(),
                    url: None,
                    thumbnail_url: None,
                    metadata: None,
                },
            ],
        },
    );

    // Removing the first entry shifts "f2" into index 0; a poll captured
    // against index 1 no longer matches any entry.
    let (state, _effects) = update(state, Msg::FileRemoved { index: 0 });
    let (state, effects) = update(
        state,
        Msg::PollUpdate {
            index: 1,
            file_id: "f2".to_string(),
            percentage: 90,
            phase: ServerPhase::Completed,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().files[0].status, EntryStatus::Success);
}
