//! Daemon app runner

use std::process::ExitCode;

use tracing::{info, warn};

use super::app::{spawn_recorder, EXIT_ERROR, EXIT_SUCCESS};
use super::args::DaemonOptions;
use super::ipc::create_ipc_server;
use super::pid_file::{PidFile, PidFileError};
use super::presenter::Presenter;
use super::signals::DaemonSignalHandler;

/// Run daemon mode until SIGINT or SIGTERM
pub async fn run_daemon(options: DaemonOptions) -> ExitCode {
    let presenter = Presenter::new();

    let mut pid_file = PidFile::new();
    if let Err(e) = pid_file.acquire() {
        match e {
            PidFileError::AlreadyRunning(pid) => {
                presenter.error(&format!("Another daemon is already running (PID: {})", pid));
            }
            _ => presenter.error(&e.to_string()),
        }
        return ExitCode::from(EXIT_ERROR);
    }

    let mut signals = match DaemonSignalHandler::new() {
        Ok(s) => s,
        Err(e) => {
            presenter.error(&format!("Failed to setup signal handler: {}", e));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let mut server = create_ipc_server();
    if let Err(e) = server.bind() {
        presenter.error(&format!("Failed to bind socket: {}", e));
        return ExitCode::from(EXIT_ERROR);
    }
    let socket = server.path();

    let recorder = spawn_recorder(&options.recorder, options.output_dir.clone());
    let handle = recorder.handle();
    let mut status = handle.subscribe();

    let server_task = tokio::spawn(async move {
        if let Err(e) = server.run(handle).await {
            warn!(error = %e, "IPC server stopped");
        }
    });

    presenter.daemon_status("Started, waiting for commands...");
    presenter.info(&format!(
        "PID: {} | Socket: {} | Output: {}",
        std::process::id(),
        socket,
        options.output_dir.display()
    ));
    info!(
        max_duration = %options.recorder.max_duration,
        format = %options.recorder.format,
        chunk_cap = options.recorder.chunk_cap,
        "Recorder ready"
    );

    let mut saved_count = 0;
    let clean = loop {
        tokio::select! {
            signal = signals.recv() => {
                if let Some(signal) = signal {
                    info!(?signal, "Shutting down");
                }
                break true;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    presenter.error("Recorder stopped unexpectedly");
                    break false;
                }
                let report = status.borrow_and_update().clone();
                presenter.daemon_status(&presenter.format_status_line(&report));
                if report.saved_count > saved_count {
                    saved_count = report.saved_count;
                    if let Some(saved) = report.last_saved {
                        presenter.output(&saved.location);
                    }
                }
            }
        }
    };

    presenter.daemon_status("Shutting down...");

    // Stopping the server drops every handle it holds, open connections
    // included, and removes the socket file
    server_task.abort();
    let _ = server_task.await;
    recorder.shutdown().await;

    if let Err(e) = pid_file.release() {
        presenter.warn(&e.to_string());
    }

    if clean {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        ExitCode::from(EXIT_ERROR)
    }
}
