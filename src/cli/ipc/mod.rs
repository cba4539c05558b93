//! IPC (Inter-Process Communication) for daemon control
//!
//! One request line per connection, one reply line back:
//!
//! | request            | reply                          |
//! |--------------------|--------------------------------|
//! | `start <source>`   | `ok` / `ignored` / `error: ..` |
//! | `stop`             | `ok` / `ignored` / `error: ..` |
//! | `status`           | status JSON / `error: ..`      |
//! | `clear-error`      | `ok` / `ignored` / `error: ..` |

#[cfg(unix)]
mod unix_socket;

#[cfg(unix)]
pub use unix_socket::{SocketPath, UnixSocketClient, UnixSocketServer};

use std::fmt;
use std::io;
use std::str::FromStr;

use thiserror::Error;

use super::args::DaemonAction;
use crate::application::ports::SourceHandle;
use crate::application::{Ack, RecorderHandle, StatusReport};

/// Trait for IPC servers that listen for daemon commands
#[async_trait::async_trait]
pub trait IpcServer: Send + Sync {
    /// Bind to the IPC endpoint
    fn bind(&mut self) -> io::Result<()>;

    /// Get the path/name of the IPC endpoint
    fn path(&self) -> String;

    /// Accept connections forever, answering each request through `recorder`
    async fn run(&self, recorder: RecorderHandle) -> io::Result<()>;

    /// Cleanup IPC resources
    fn cleanup(&self);
}

/// Trait for IPC clients that send commands to the daemon
#[async_trait::async_trait]
pub trait IpcClient: Send + Sync {
    /// Check if daemon appears to be running (endpoint exists)
    fn is_daemon_running(&self) -> bool;

    /// Send a command and receive the reply line
    async fn send_command(&self, cmd: &str) -> io::Result<String>;
}

/// Create the IPC server for the current platform
#[cfg(unix)]
pub fn create_ipc_server() -> Box<dyn IpcServer> {
    Box::new(UnixSocketServer::new(SocketPath::new()))
}

/// Create the IPC client for the current platform
#[cfg(unix)]
pub fn create_ipc_client() -> Box<dyn IpcClient> {
    Box::new(UnixSocketClient::new(SocketPath::new()))
}

/// A request line that could not be understood
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("unknown command")]
    Unknown,
    #[error("missing source")]
    MissingSource,
}

impl fmt::Display for DaemonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start(source) => write!(f, "start {}", source),
            Self::Stop => write!(f, "stop"),
            Self::Status => write!(f, "status"),
            Self::ClearError => write!(f, "clear-error"),
        }
    }
}

impl FromStr for DaemonAction {
    type Err = CommandParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb {
            "start" if rest.is_empty() => Err(CommandParseError::MissingSource),
            "start" => Ok(Self::Start(SourceHandle::new(rest))),
            "stop" if rest.is_empty() => Ok(Self::Stop),
            "status" if rest.is_empty() => Ok(Self::Status),
            "clear-error" if rest.is_empty() => Ok(Self::ClearError),
            _ => Err(CommandParseError::Unknown),
        }
    }
}

/// A parsed reply line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonReply {
    Ack(Ack),
    Status(Box<StatusReport>),
    Error(String),
}

impl DaemonReply {
    /// Render as a single line, without the trailing newline
    pub fn to_line(&self) -> String {
        match self {
            Self::Ack(Ack::Accepted) => "ok".to_string(),
            Self::Ack(Ack::Ignored) => "ignored".to_string(),
            Self::Status(report) => serde_json::to_string(report)
                .unwrap_or_else(|e| format!("error: {}", e)),
            Self::Error(message) => format!("error: {}", message),
        }
    }

    /// Parse a reply line received by the client
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line {
            "ok" => Self::Ack(Ack::Accepted),
            "ignored" => Self::Ack(Ack::Ignored),
            _ => {
                if let Some(message) = line.strip_prefix("error:") {
                    return Self::Error(message.trim().to_string());
                }
                match serde_json::from_str::<StatusReport>(line) {
                    Ok(report) => Self::Status(Box::new(report)),
                    Err(_) => Self::Error(format!("unexpected reply: {}", line)),
                }
            }
        }
    }
}

/// Answer one request line through the recorder
pub async fn dispatch(recorder: &RecorderHandle, line: &str) -> DaemonReply {
    let action = match line.parse::<DaemonAction>() {
        Ok(action) => action,
        Err(e) => return DaemonReply::Error(e.to_string()),
    };

    let result = match action {
        DaemonAction::Start(source) => recorder.start(source).await.map(DaemonReply::Ack),
        DaemonAction::Stop => recorder.stop().await.map(DaemonReply::Ack),
        DaemonAction::Status => recorder
            .status()
            .await
            .map(|report| DaemonReply::Status(Box::new(report))),
        DaemonAction::ClearError => recorder.clear_error().await.map(DaemonReply::Ack),
    };
    result.unwrap_or_else(|e| DaemonReply::Error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::{SessionId, SessionState};

    #[test]
    fn parses_commands() {
        assert_eq!(
            "start synthetic:880".parse::<DaemonAction>(),
            Ok(DaemonAction::Start(SourceHandle::new("synthetic:880")))
        );
        assert_eq!("stop\n".parse::<DaemonAction>(), Ok(DaemonAction::Stop));
        assert_eq!("status".parse::<DaemonAction>(), Ok(DaemonAction::Status));
        assert_eq!(
            "clear-error".parse::<DaemonAction>(),
            Ok(DaemonAction::ClearError)
        );
    }

    #[test]
    fn start_keeps_device_names_with_spaces() {
        assert_eq!(
            "start  USB Audio Device ".parse::<DaemonAction>(),
            Ok(DaemonAction::Start(SourceHandle::new("USB Audio Device")))
        );
    }

    #[test]
    fn rejects_bad_commands() {
        assert_eq!(
            "start".parse::<DaemonAction>(),
            Err(CommandParseError::MissingSource)
        );
        assert_eq!(
            "toggle".parse::<DaemonAction>(),
            Err(CommandParseError::Unknown)
        );
        assert_eq!(
            "stop now".parse::<DaemonAction>(),
            Err(CommandParseError::Unknown)
        );
    }

    #[test]
    fn command_line_matches_parser() {
        for action in [
            DaemonAction::Start(SourceHandle::new("default")),
            DaemonAction::Stop,
            DaemonAction::Status,
            DaemonAction::ClearError,
        ] {
            assert_eq!(action.to_string().parse::<DaemonAction>(), Ok(action));
        }
    }

    #[test]
    fn reply_lines() {
        assert_eq!(DaemonReply::Ack(Ack::Accepted).to_line(), "ok");
        assert_eq!(DaemonReply::Ack(Ack::Ignored).to_line(), "ignored");
        assert_eq!(
            DaemonReply::Error("boom".to_string()).to_line(),
            "error: boom"
        );
        assert_eq!(
            DaemonReply::parse("error: unknown command\n"),
            DaemonReply::Error("unknown command".to_string())
        );
    }

    #[test]
    fn status_reply_is_json() {
        let report = StatusReport {
            is_recording: true,
            state: SessionState::Active,
            session: Some(SessionId::new(7)),
            ..Default::default()
        };
        let line = DaemonReply::Status(Box::new(report.clone())).to_line();
        assert!(line.contains("\"isRecording\":true"));
        assert!(!line.contains('\n'));
        assert_eq!(DaemonReply::parse(&line), DaemonReply::Status(Box::new(report)));
    }

    #[test]
    fn garbage_reply_is_an_error() {
        assert!(matches!(
            DaemonReply::parse("what"),
            DaemonReply::Error(_)
        ));
    }
}
