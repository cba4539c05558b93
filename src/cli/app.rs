//! Main app runner for one-shot recording

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration as StdDuration;

use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::warn;

use crate::application::ports::ConfigStore;
use crate::application::{Ack, Recorder, RecorderHandle, StatusReport};
use crate::domain::config::{AppConfig, RecorderConfig};
use crate::domain::session::SessionState;
use crate::infrastructure::{create_encoder, FilesystemSink, HostAudioSource};

use super::args::RecordOptions;
use super::presenter::Presenter;
use super::signals::ShutdownSignal;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Progress refresh period while recording
const PROGRESS_TICK: StdDuration = StdDuration::from_millis(100);

/// Spawn a recorder wired to the host adapters
pub fn spawn_recorder(config: &RecorderConfig, output_dir: PathBuf) -> Recorder {
    Recorder::spawn(
        HostAudioSource::new(),
        create_encoder(config.format, config.sample_rate),
        FilesystemSink::new(output_dir),
        config,
    )
}

/// Output directory from config, or the platform download directory
pub fn resolve_output_dir(config: &AppConfig) -> PathBuf {
    config
        .output_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(FilesystemSink::default_dir)
}

/// Run a single foreground recording and save it
pub async fn run_record(options: RecordOptions) -> ExitCode {
    let mut presenter = Presenter::new();

    let shutdown = ShutdownSignal::new();
    shutdown.setup();

    let recorder = spawn_recorder(&options.recorder, options.output_dir.clone());
    let handle = recorder.handle();

    let result = record_once(&handle, &options, &shutdown, &mut presenter).await;
    drop(handle);
    recorder.shutdown().await;

    match result {
        Ok(report) => match report.last_saved {
            Some(saved) => {
                presenter.spinner_success(&format!("Saved ({} bytes)", saved.size));
                presenter.output(&saved.location);
                ExitCode::from(EXIT_SUCCESS)
            }
            None => {
                let message = report
                    .last_error
                    .unwrap_or_else(|| "Recording was not saved".to_string());
                presenter.stop_spinner();
                presenter.error(&message);
                ExitCode::from(EXIT_ERROR)
            }
        },
        Err(message) => {
            presenter.stop_spinner();
            presenter.error(&message);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Start, wait out the duration (or Ctrl+C), stop, and wait for the save
async fn record_once(
    recorder: &RecorderHandle,
    options: &RecordOptions,
    shutdown: &ShutdownSignal,
    presenter: &mut Presenter,
) -> Result<StatusReport, String> {
    let mut status = recorder.subscribe();
    let saved_before = status.borrow().saved_count;

    match recorder.start(options.source.clone()).await {
        Ok(Ack::Accepted) => {}
        Ok(Ack::Ignored) => return Err("Recorder is busy".to_string()),
        Err(e) => return Err(e.to_string()),
    }

    let started = status
        .wait_for(|s| s.state != SessionState::Starting)
        .await
        .map_err(|e| e.to_string())?
        .clone();
    if started.state != SessionState::Active {
        return Err(started
            .last_error
            .unwrap_or_else(|| format!("Failed to start recording from {}", options.source)));
    }

    let total_ms = options
        .duration
        .as_millis()
        .min(options.recorder.max_duration.as_millis());
    presenter.start_spinner(&format!("Recording from {}...", options.source));

    let begin = Instant::now();
    let mut ticker = interval(PROGRESS_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let elapsed_ms = begin.elapsed().as_millis() as u64;
        presenter.update_recording_progress(elapsed_ms.min(total_ms), total_ms);

        if shutdown.is_shutdown() {
            presenter.update_spinner("Interrupted, saving...");
            break;
        }
        if elapsed_ms >= total_ms || !status.borrow().is_recording {
            break;
        }
    }

    presenter.update_spinner("Saving...");
    if let Err(e) = recorder.stop().await {
        warn!(error = %e, "Stop request failed");
    }

    let done = status
        .wait_for(|s| s.state == SessionState::Idle && s.pending_transfers == 0)
        .await
        .map_err(|e| e.to_string())?
        .clone();

    if done.saved_count > saved_before {
        Ok(done)
    } else {
        Ok(StatusReport {
            last_saved: None,
            ..done
        })
    }
}

/// Load and merge configuration: defaults < file < CLI
pub async fn load_merged_config<S: ConfigStore>(store: &S, cli_config: AppConfig) -> AppConfig {
    let file_config = match store.load().await {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %store.path().display(), error = %e, "Ignoring unreadable config file");
            AppConfig::empty()
        }
    };

    AppConfig::defaults().merge(file_config).merge(cli_config)
}
