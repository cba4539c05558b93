//! Daemon command handler - sends commands to running daemon via IPC

use crate::application::Ack;

use super::args::DaemonAction;
use super::ipc::{create_ipc_client, DaemonReply};
use super::presenter::Presenter;

/// Handle a daemon control subcommand
pub async fn handle_daemon_command(
    action: DaemonAction,
    presenter: &Presenter,
) -> Result<(), String> {
    let client = create_ipc_client();

    if !client.is_daemon_running() {
        return Err("No daemon running. Start with: tape-relay daemon".to_string());
    }

    let response = client
        .send_command(&action.to_string())
        .await
        .map_err(|e| format!("Failed to communicate with daemon: {}", e))?;

    match (DaemonReply::parse(&response), &action) {
        (DaemonReply::Error(message), _) => Err(message),
        (DaemonReply::Status(report), DaemonAction::Status) => {
            presenter.status_report(&report);
            Ok(())
        }
        (DaemonReply::Ack(Ack::Accepted), _) => {
            presenter.success(&format!("Command accepted: {}", action));
            Ok(())
        }
        (DaemonReply::Ack(Ack::Ignored), _) => {
            presenter.warn(&format!("Command ignored in current state: {}", action));
            Ok(())
        }
        (DaemonReply::Status(_), _) => Err(format!("Unexpected reply to {}", action)),
    }
}
