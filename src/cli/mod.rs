//! CLI layer - Command-line interface
//!
//! Contains argument parsing, output formatting, signal handling,
//! daemon control over IPC, and the main application runners.

pub mod app;
pub mod args;
pub mod config_cmd;
#[cfg(unix)]
pub mod daemon_app;
#[cfg(unix)]
pub mod daemon_cmd;
pub mod ipc;
#[cfg(unix)]
pub mod pid_file;
pub mod presenter;
pub mod signals;

// Re-export commonly used types
pub use app::{run_record, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE_ERROR};
pub use args::{Cli, Commands, ConfigAction, DaemonAction, DaemonOptions, RecordOptions};
#[cfg(unix)]
pub use daemon_app::run_daemon;
#[cfg(unix)]
pub use daemon_cmd::handle_daemon_command;
pub use presenter::Presenter;
