//! Unix Domain Socket communication for daemon control

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{dispatch, IpcClient, IpcServer};
use crate::application::RecorderHandle;

const SOCKET_NAME: &str = "tape-relay.sock";

/// How long a client may take to send its command line
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest accepted command line, in bytes
const MAX_LINE_BYTES: u64 = 4096;

/// Socket path resolver
#[derive(Debug, Clone)]
pub struct SocketPath {
    path: PathBuf,
}

impl SocketPath {
    /// Create socket path, preferring XDG_RUNTIME_DIR
    pub fn new() -> Self {
        let path = std::env::var("XDG_RUNTIME_DIR")
            .map(|dir| PathBuf::from(dir).join(SOCKET_NAME))
            .unwrap_or_else(|_| std::env::temp_dir().join(SOCKET_NAME));
        Self { path }
    }

    /// Socket at an explicit location
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the socket path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if socket file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Remove socket file if it exists
    pub fn cleanup(&self) -> io::Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

impl Default for SocketPath {
    fn default() -> Self {
        Self::new()
    }
}

/// Unix Domain Socket server for daemon commands
pub struct UnixSocketServer {
    socket_path: SocketPath,
    listener: Option<UnixListener>,
}

impl UnixSocketServer {
    /// Create a new socket server
    pub fn new(socket_path: SocketPath) -> Self {
        Self {
            socket_path,
            listener: None,
        }
    }
}

impl Drop for UnixSocketServer {
    fn drop(&mut self) {
        if self.listener.is_some() {
            self.cleanup();
        }
    }
}

#[async_trait]
impl IpcServer for UnixSocketServer {
    fn bind(&mut self) -> io::Result<()> {
        // Remove stale socket file if it exists
        self.socket_path.cleanup()?;

        let listener = UnixListener::bind(self.socket_path.path())?;
        self.listener = Some(listener);
        Ok(())
    }

    fn path(&self) -> String {
        self.socket_path.path().to_string_lossy().to_string()
    }

    async fn run(&self, recorder: RecorderHandle) -> io::Result<()> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "Socket not bound"))?;

        // Dropped with this future, aborting every open connection
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        let recorder = recorder.clone();
                        connections.spawn(async move {
                            if let Err(e) = handle_connection(stream, recorder).await {
                                warn!(error = %e, "Socket connection error");
                            }
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "Socket accept error");
                    }
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }
    }

    fn cleanup(&self) {
        let _ = self.socket_path.cleanup();
    }
}

/// Handle a single client connection
async fn handle_connection(stream: UnixStream, recorder: RecorderHandle) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader.take(MAX_LINE_BYTES));
    let mut line = String::new();

    timeout(READ_TIMEOUT, reader.read_line(&mut line))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "No command received"))??;
    debug!(command = %line.trim(), "Daemon command");

    let reply = dispatch(&recorder, &line).await;
    writer.write_all(format!("{}\n", reply.to_line()).as_bytes()).await?;
    writer.flush().await?;

    Ok(())
}

/// Unix Domain Socket client for sending commands to daemon
pub struct UnixSocketClient {
    socket_path: SocketPath,
}

impl UnixSocketClient {
    /// Create a new socket client
    pub fn new(socket_path: SocketPath) -> Self {
        Self { socket_path }
    }
}

#[async_trait]
impl IpcClient for UnixSocketClient {
    fn is_daemon_running(&self) -> bool {
        self.socket_path.exists()
    }

    async fn send_command(&self, cmd: &str) -> io::Result<String> {
        let stream = UnixStream::connect(self.socket_path.path()).await?;
        let (reader, mut writer) = stream.into_split();

        writer.write_all(format!("{}\n", cmd).as_bytes()).await?;
        writer.flush().await?;

        let mut reader = BufReader::new(reader);
        let mut response = String::new();
        reader.read_line(&mut response).await?;

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        DownloadHandle, PersistenceError, PersistenceSink, SourceHandle,
    };
    use crate::application::{Ack, Recorder};
    use crate::cli::ipc::DaemonReply;
    use crate::domain::config::RecorderConfig;
    use crate::domain::session::SessionState;
    use crate::infrastructure::{SyntheticSource, WavEncoder};

    struct DiscardSink;

    #[async_trait]
    impl PersistenceSink for DiscardSink {
        async fn save(
            &self,
            bytes: Vec<u8>,
            suggested_filename: &str,
        ) -> Result<DownloadHandle, PersistenceError> {
            Ok(DownloadHandle {
                location: suggested_filename.to_string(),
                size: bytes.len(),
            })
        }
    }

    #[test]
    fn socket_path_uses_xdg_runtime_dir() {
        let path = std::env::var("XDG_RUNTIME_DIR")
            .map(|dir| PathBuf::from(dir).join(SOCKET_NAME))
            .unwrap_or_else(|_| std::env::temp_dir().join(SOCKET_NAME));

        let socket_path = SocketPath::new();
        assert_eq!(socket_path.path(), path.as_path());
    }

    #[tokio::test]
    async fn serves_commands_over_socket() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = SocketPath::with_path(dir.path().join("test.sock"));

        let recorder = Recorder::spawn(
            SyntheticSource::new(),
            WavEncoder::new(),
            DiscardSink,
            &RecorderConfig::default(),
        );
        let mut server = UnixSocketServer::new(socket_path.clone());
        server.bind().unwrap();
        let handle = recorder.handle();
        let server_task = tokio::spawn(async move { server.run(handle).await });

        let client = UnixSocketClient::new(socket_path.clone());
        assert!(client.is_daemon_running());

        let reply = client.send_command("stop").await.unwrap();
        assert_eq!(DaemonReply::parse(&reply), DaemonReply::Ack(Ack::Ignored));

        let reply = client.send_command("status").await.unwrap();
        match DaemonReply::parse(&reply) {
            DaemonReply::Status(report) => assert!(!report.is_recording),
            other => panic!("Expected status, got {:?}", other),
        }

        let reply = client.send_command("bogus").await.unwrap();
        assert_eq!(
            DaemonReply::parse(&reply),
            DaemonReply::Error("unknown command".to_string())
        );

        server_task.abort();
        let _ = server_task.await;
        assert!(!socket_path.exists());
        recorder.shutdown().await;
    }

    fn spawn_recorder() -> Recorder {
        Recorder::spawn(
            SyntheticSource::new(),
            WavEncoder::new(),
            DiscardSink,
            &RecorderConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn idle_client_is_disconnected() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = SocketPath::with_path(dir.path().join("idle.sock"));

        let recorder = spawn_recorder();
        let mut server = UnixSocketServer::new(socket_path.clone());
        server.bind().unwrap();
        let handle = recorder.handle();
        let server_task = tokio::spawn(async move { server.run(handle).await });

        let mut silent = UnixStream::connect(socket_path.path()).await.unwrap();
        let mut buf = Vec::new();
        let read = tokio::time::timeout(READ_TIMEOUT * 2, silent.read_to_end(&mut buf))
            .await
            .expect("server closed the idle connection");
        assert_eq!(read.unwrap(), 0);

        server_task.abort();
        let _ = server_task.await;
        recorder.shutdown().await;
    }

    #[tokio::test]
    async fn stopping_server_releases_open_connections() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = SocketPath::with_path(dir.path().join("open.sock"));

        let recorder = spawn_recorder();
        let handle = recorder.handle();
        let mut status = handle.subscribe();
        handle.start(SourceHandle::new("synthetic")).await.unwrap();
        status
            .wait_for(|s| s.state == SessionState::Active)
            .await
            .unwrap();

        let mut server = UnixSocketServer::new(socket_path.clone());
        server.bind().unwrap();
        let server_handle = recorder.handle();
        let server_task = tokio::spawn(async move { server.run(server_handle).await });

        // Connected, never sends a line
        let _silent = UnixStream::connect(socket_path.path()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        server_task.abort();
        let _ = server_task.await;
        drop(handle);

        tokio::time::timeout(Duration::from_secs(3), recorder.shutdown())
            .await
            .expect("shutdown is not held up by an open connection");
        assert_eq!(status.borrow().state, SessionState::Idle);
    }
}
