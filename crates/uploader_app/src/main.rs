//! CLI driver: upload the files named on the command line, then follow
//! their server-side processing to a terminal state.
mod runner;

use std::collections::BTreeSet;
use std::path::Path;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use client_logging::{client_error, LogDestination};
use uploader_core::{update, AppState, EntryStatus, Msg, NewFile};
use uploader_engine::{ApiConfig, EngineHandle, UploadSource};

use crate::runner::EffectRunner;

fn main() -> ExitCode {
    client_logging::initialize(LogDestination::Terminal);

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("usage: uploader_app <file>...");
        eprintln!("       UPLOADER_BASE_URL overrides the service base URL");
        return ExitCode::FAILURE;
    }

    let base_url =
        std::env::var("UPLOADER_BASE_URL").unwrap_or_else(|_| ApiConfig::default().base_url);

    let engine = match EngineHandle::new(ApiConfig::new(base_url.clone())) {
        Ok(engine) => engine,
        Err(err) => {
            client_error!("engine failed to start: {err}");
            return ExitCode::FAILURE;
        }
    };
    let mut runner = EffectRunner::new(engine);
    let mut state = AppState::new(base_url);

    let (files, sources) = match read_sources(&paths) {
        Ok(pair) => pair,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    runner.stage_payloads(sources);
    state = dispatch(state, Msg::FilesAdded { files }, &mut runner);

    let mut polled = BTreeSet::new();
    loop {
        for msg in runner.drain_events() {
            state = dispatch(state, msg, &mut runner);
        }

        // Follow server-side processing for every delivered entry.
        let ready: Vec<usize> = state
            .files()
            .iter()
            .enumerate()
            .filter(|(index, entry)| {
                entry.status == EntryStatus::Success
                    && entry.id.is_some()
                    && !polled.contains(index)
            })
            .map(|(index, _)| index)
            .collect();
        for index in ready {
            polled.insert(index);
            state = dispatch(state, Msg::PollingRequested { index }, &mut runner);
        }

        let view = state.view();
        let settled = !view.is_uploading
            && view.files.iter().all(|row| {
                matches!(
                    row.status,
                    EntryStatus::Completed
                        | EntryStatus::Failed
                        | EntryStatus::Error
                        | EntryStatus::Stalled
                )
            });
        if settled {
            let all_completed = view
                .files
                .iter()
                .all(|row| row.status == EntryStatus::Completed);
            return if all_completed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
        }

        thread::sleep(Duration::from_millis(50));
    }
}

/// Apply one message, execute its effects and re-render when the state
/// changed.
fn dispatch(state: AppState, msg: Msg, runner: &mut EffectRunner) -> AppState {
    let (mut state, effects) = update(state, msg);
    runner.run_effects(effects);
    if state.consume_dirty() {
        render(&state);
    }
    state
}

fn render(state: &AppState) {
    for row in state.view().files {
        println!(
            "{:>3}% {:<9} {}",
            row.upload_progress,
            row.status.as_str(),
            row.name
        );
    }
}

fn read_sources(paths: &[String]) -> Result<(Vec<NewFile>, Vec<UploadSource>), String> {
    let mut files = Vec::new();
    let mut sources = Vec::new();
    for raw in paths {
        let path = Path::new(raw);
        let bytes = std::fs::read(path).map_err(|err| format!("cannot read {raw}: {err}"))?;
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(raw)
            .to_string();
        let mime_type = guess_mime(path).to_string();
        files.push(NewFile {
            name: name.clone(),
            size: bytes.len() as u64,
            mime_type: mime_type.clone(),
        });
        sources.push(UploadSource {
            name,
            mime_type,
            bytes: Bytes::from(bytes),
        });
    }
    Ok((files, sources))
}

fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        _ => "application/octet-stream",
    }
}
