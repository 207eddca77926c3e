use std::sync::Once;

use uploader_core::{update, AppState, Effect, EntryStatus, Msg, NewFile, RemoteFile};

const BASE: &str = "http://media.example.com/api/v1";

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(client_logging::initialize_for_tests);
}

fn files(names: &[&str]) -> Vec<NewFile> {
    names
        .iter()
        .map(|name| NewFile {
            name: name.to_string(),
            size: 512,
            mime_type: "image/jpeg".to_string(),
        })
        .collect()
}

#[test]
fn removing_an_in_flight_entry_cancels_its_batch() {
    init_logging();
    let state = AppState::new(BASE);
    let (state, _effects) = update(state, Msg::FilesAdded { files: files(&["a.jpg", "b.jpg"]) });

    let (state, effects) = update(state, Msg::FileRemoved { index: 0 });
    assert_eq!(effects, vec![Effect::CancelBatch { batch: 1 }]);

    let view = state.view();
    assert_eq!(view.files.len(), 1);
    assert_eq!(view.files[0].name, "b.jpg");
    // The aborted transfer has not settled yet.
    assert!(view.is_uploading);

    // The engine rejects the aborted transfer; the surviving entry picks
    // up the cancellation message.
    let (state, _effects) = update(
        state,
        Msg::TransferFailed {
            batch: 1,
            message: "upload cancelled".to_string(),
        },
    );
    let view = state.view();
    assert!(!view.is_uploading);
    assert_eq!(view.files[0].status, EntryStatus::Error);
    assert_eq!(view.files[0].error.as_deref(), Some("upload cancelled"));
}

#[test]
fn removing_a_polled_entry_stops_its_poll_loop() {
    init_logging();
    let state = AppState::new(BASE);
    let (state, _effects) = update(state, Msg::FilesAdded { files: files(&["a.jpg"]) });
    let (state, _effects) = update(
        state,
        Msg::TransferDelivered {
            batch: 1,
            files: vec![RemoteFile {
                id: "f1".to_string(),
                url: None,
                thumbnail_url: None,
                metadata: None,
            }],
        },
    );

    let (state, effects) = update(state, Msg::FileRemoved { index: 0 });
    assert_eq!(
        effects,
        vec![Effect::StopPolling {
            file_id: "f1".to_string(),
        }]
    );
    assert!(state.view().files.is_empty());
}

#[test]
fn removing_an_unknown_index_is_a_noop() {
    init_logging();
    let state = AppState::new(BASE);
    let (state, _effects) = update(state, Msg::FilesAdded { files: files(&["a.jpg"]) });

    let (mut state, effects) = update(state, Msg::FileRemoved { index: 5 });
    assert!(effects.is_empty());
    assert_eq!(state.view().files.len(), 1);
    state.consume_dirty();
    assert!(!state.consume_dirty());
}

#[test]
fn clearing_cancels_each_live_batch_once_and_stops_every_poll() {
    init_logging();
    let state = AppState::new(BASE);
    // Batch 1 settles and starts polling; batch 2 stays in flight.
    let (state, _effects) = update(state, Msg::FilesAdded { files: files(&["a.jpg"]) });
    let (state, _effects) = update(
        state,
        Msg::TransferDelivered {
            batch: 1,
            files: vec![RemoteFile {
                id: "f1".to_string(),
                url: None,
                thumbnail_url: None,
                metadata: None,
            }],
        },
    );
    let (state, _effects) = update(state, Msg::FilesAdded { files: files(&["b.jpg", "c.jpg"]) });

    let (state, effects) = update(state, Msg::FilesCleared);
    assert_eq!(
        effects,
        vec![
            Effect::CancelBatch { batch: 2 },
            Effect::StopPolling {
                file_id: "f1".to_string(),
            },
        ]
    );
    assert!(state.view().files.is_empty());
}

#[test]
fn clearing_an_empty_session_is_a_noop() {
    init_logging();
    let state = AppState::new(BASE);
    let (mut state, effects) = update(state, Msg::FilesCleared);
    assert!(effects.is_empty());
    assert!(!state.consume_dirty());
}
