//! TapeRelay CLI entry point

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tape_relay::application::ports::SourceHandle;
use tape_relay::cli::{
    app::{load_merged_config, resolve_output_dir, run_record, EXIT_ERROR, EXIT_USAGE_ERROR},
    args::{Cli, Commands, DaemonAction, DaemonOptions, RecordOptions},
    config_cmd::handle_config_command,
    presenter::Presenter,
};
use tape_relay::domain::config::{AppConfig, RecorderConfig};
use tape_relay::domain::recording::{AudioMimeType, Duration};
use tape_relay::infrastructure::XdgConfigStore;

/// Log to stderr; RUST_LOG overrides the per-command default
fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let presenter = Presenter::new();

    init_tracing(match cli.command {
        Commands::Daemon => "tape_relay=info",
        _ => "tape_relay=warn",
    });

    let store = match cli.config.clone() {
        Some(path) => XdgConfigStore::with_path(path),
        None => XdgConfigStore::new(),
    };

    // Build CLI config from args
    let cli_config = AppConfig {
        max_duration: cli.max_duration.clone(),
        format: cli
            .format
            .map(|f| AudioMimeType::from(f).extension().to_string()),
        sample_rate: cli.sample_rate,
        output_dir: cli.output_dir.clone(),
        legacy_single_message: if cli.legacy_single_message {
            Some(true)
        } else {
            None
        },
        ..Default::default()
    };

    match cli.command {
        Commands::Config { action } => {
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            ExitCode::SUCCESS
        }
        Commands::Start { source } => {
            control(DaemonAction::Start(SourceHandle::new(source)), &presenter).await
        }
        Commands::Stop => control(DaemonAction::Stop, &presenter).await,
        Commands::Status => control(DaemonAction::Status, &presenter).await,
        Commands::ClearError => control(DaemonAction::ClearError, &presenter).await,
        Commands::Daemon => {
            let config = load_merged_config(&store, cli_config).await;
            let (recorder, output_dir) = match recorder_settings(&config, &presenter) {
                Ok(settings) => settings,
                Err(code) => return code,
            };
            daemon(DaemonOptions {
                recorder,
                output_dir,
            })
            .await
        }
        Commands::Record { source, duration } => {
            let config = load_merged_config(&store, cli_config).await;
            let (recorder, output_dir) = match recorder_settings(&config, &presenter) {
                Ok(settings) => settings,
                Err(code) => return code,
            };

            let duration = match duration.as_deref() {
                Some(s) => match s.parse::<Duration>() {
                    Ok(d) => d,
                    Err(e) => {
                        presenter.error(&format!("Invalid duration: {}", e));
                        return ExitCode::from(EXIT_USAGE_ERROR);
                    }
                },
                None => Duration::default_record(),
            };

            run_record(RecordOptions {
                source: SourceHandle::new(source),
                duration,
                recorder,
                output_dir,
            })
            .await
        }
    }
}

/// Validate the merged config for a recorder run
fn recorder_settings(
    config: &AppConfig,
    presenter: &Presenter,
) -> Result<(RecorderConfig, PathBuf), ExitCode> {
    match RecorderConfig::from_app_config(config) {
        Ok(recorder) => Ok((recorder, resolve_output_dir(config))),
        Err(e) => {
            presenter.error(&e.to_string());
            Err(ExitCode::from(EXIT_USAGE_ERROR))
        }
    }
}

#[cfg(unix)]
async fn daemon(options: DaemonOptions) -> ExitCode {
    tape_relay::cli::run_daemon(options).await
}

#[cfg(not(unix))]
async fn daemon(_options: DaemonOptions) -> ExitCode {
    Presenter::new().error("Daemon mode is only supported on Unix platforms");
    ExitCode::from(EXIT_ERROR)
}

#[cfg(unix)]
async fn control(action: DaemonAction, presenter: &Presenter) -> ExitCode {
    match tape_relay::cli::handle_daemon_command(action, presenter).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            presenter.error(&e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

#[cfg(not(unix))]
async fn control(_action: DaemonAction, presenter: &Presenter) -> ExitCode {
    presenter.error("Daemon control is only supported on Unix platforms");
    ExitCode::from(EXIT_ERROR)
}
