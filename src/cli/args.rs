//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::application::ports::SourceHandle;
use crate::domain::config::RecorderConfig;
use crate::domain::recording::{AudioMimeType, Duration};

/// Default source for `record`
pub const DEFAULT_SOURCE: &str = "default";

/// TapeRelay - live audio capture with chunked hand-off to storage
#[derive(Parser, Debug)]
#[command(name = "tape-relay")]
#[command(version)]
#[command(about = "Record live audio and hand it off in chunks to durable storage")]
#[command(long_about = None)]
pub struct Cli {
    /// Container format for saved recordings
    #[arg(short = 'f', long, global = true, value_name = "FORMAT")]
    pub format: Option<FormatArg>,

    /// Directory recordings are saved into
    #[arg(short = 'o', long, global = true, value_name = "DIR")]
    pub output_dir: Option<String>,

    /// Auto-stop a session after this long (e.g., 30s, 1m30s)
    #[arg(long, global = true, value_name = "TIME")]
    pub max_duration: Option<String>,

    /// Resample recordings to this rate before packaging
    #[arg(long, global = true, value_name = "HZ")]
    pub sample_rate: Option<u32>,

    /// Send recordings that fit in one chunk as a single message
    #[arg(long, global = true)]
    pub legacy_single_message: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH", env = "TAPE_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the recorder as a daemon controlled over a local socket
    Daemon,
    /// Ask the daemon to start recording from a source
    Start {
        /// Source handle: "default", a device name, or synthetic[:hz]
        source: String,
    },
    /// Ask the daemon to stop the active recording
    Stop,
    /// Show the daemon's recorder status
    Status,
    /// Acknowledge the daemon's last error
    ClearError,
    /// Record once in the foreground and save the result
    Record {
        /// Source handle: "default", a device name, or synthetic[:hz]
        #[arg(short = 's', long, default_value = DEFAULT_SOURCE)]
        source: String,

        /// Recording duration (e.g., 10s, 1m, 2m30s)
        #[arg(short = 'd', long, value_name = "TIME")]
        duration: Option<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Daemon control actions, sent over the socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonAction {
    Start(SourceHandle),
    Stop,
    Status,
    ClearError,
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Format argument for clap ValueEnum
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Wav,
    Flac,
}

impl From<FormatArg> for AudioMimeType {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Wav => AudioMimeType::Wav,
            FormatArg::Flac => AudioMimeType::Flac,
        }
    }
}

impl From<AudioMimeType> for FormatArg {
    fn from(format: AudioMimeType) -> Self {
        match format {
            AudioMimeType::Wav => FormatArg::Wav,
            AudioMimeType::Flac => FormatArg::Flac,
        }
    }
}

/// Parsed record options (one-shot mode)
#[derive(Debug, Clone)]
pub struct RecordOptions {
    pub source: SourceHandle,
    pub duration: Duration,
    pub recorder: RecorderConfig,
    pub output_dir: PathBuf,
}

/// Parsed daemon options
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    pub recorder: RecorderConfig,
    pub output_dir: PathBuf,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "max_duration",
    "format",
    "sample_rate",
    "output_dir",
    "chunk_cap",
    "max_message_bytes",
    "segment_memory_limit",
    "stale_buffer_timeout",
    "legacy_single_message",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_record_defaults() {
        let cli = Cli::parse_from(["tape-relay", "record"]);
        match cli.command {
            Commands::Record { source, duration } => {
                assert_eq!(source, "default");
                assert!(duration.is_none());
            }
            other => panic!("Expected Record, got {:?}", other),
        }
        assert!(cli.format.is_none());
        assert!(cli.output_dir.is_none());
        assert!(!cli.legacy_single_message);
    }

    #[test]
    fn cli_parses_record_options() {
        let cli = Cli::parse_from([
            "tape-relay",
            "record",
            "-s",
            "synthetic:880",
            "-d",
            "30s",
        ]);
        match cli.command {
            Commands::Record { source, duration } => {
                assert_eq!(source, "synthetic:880");
                assert_eq!(duration, Some("30s".to_string()));
            }
            other => panic!("Expected Record, got {:?}", other),
        }
    }

    #[test]
    fn cli_parses_global_overrides_after_subcommand() {
        let cli = Cli::parse_from([
            "tape-relay",
            "daemon",
            "--format",
            "flac",
            "--max-duration",
            "5m",
            "-o",
            "/tmp/out",
        ]);
        assert!(matches!(cli.command, Commands::Daemon));
        assert_eq!(cli.format, Some(FormatArg::Flac));
        assert_eq!(cli.max_duration, Some("5m".to_string()));
        assert_eq!(cli.output_dir, Some("/tmp/out".to_string()));
    }

    #[test]
    fn cli_parses_start_source() {
        let cli = Cli::parse_from(["tape-relay", "start", "synthetic"]);
        match cli.command {
            Commands::Start { source } => assert_eq!(source, "synthetic"),
            other => panic!("Expected Start, got {:?}", other),
        }
    }

    #[test]
    fn cli_requires_start_source() {
        assert!(Cli::try_parse_from(["tape-relay", "start"]).is_err());
    }

    #[test]
    fn cli_parses_control_commands() {
        assert!(matches!(
            Cli::parse_from(["tape-relay", "stop"]).command,
            Commands::Stop
        ));
        assert!(matches!(
            Cli::parse_from(["tape-relay", "status"]).command,
            Commands::Status
        ));
        assert!(matches!(
            Cli::parse_from(["tape-relay", "clear-error"]).command,
            Commands::ClearError
        ));
    }

    #[test]
    fn cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["tape-relay", "record", "--format", "mp3"]).is_err());
    }

    #[test]
    fn cli_parses_config_set() {
        let cli = Cli::parse_from(["tape-relay", "config", "set", "format", "flac"]);
        if let Commands::Config {
            action: ConfigAction::Set { key, value },
        } = cli.command
        {
            assert_eq!(key, "format");
            assert_eq!(value, "flac");
        } else {
            panic!("Expected Config Set command");
        }
    }

    #[test]
    fn format_arg_converts_to_mime_type() {
        assert_eq!(AudioMimeType::from(FormatArg::Wav), AudioMimeType::Wav);
        assert_eq!(AudioMimeType::from(FormatArg::Flac), AudioMimeType::Flac);
        assert_eq!(FormatArg::from(AudioMimeType::Flac), FormatArg::Flac);
    }

    #[test]
    fn valid_config_keys() {
        assert!(is_valid_config_key("chunk_cap"));
        assert!(is_valid_config_key("stale_buffer_timeout"));
        assert!(!is_valid_config_key("api_key"));
        assert!(!is_valid_config_key("invalid_key"));
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
