//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::{AppConfig, RecorderConfig, SAMPLE_RATE_RANGE};
use crate::domain::error::ConfigError;
use crate::domain::recording::{AudioMimeType, Duration};

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let mut config = store.load().await?;
    apply_value(&mut config, key, value)?;

    // Cross-field limits (chunk size vs message size) must still hold
    RecorderConfig::from_app_config(&AppConfig::defaults().merge(config.clone()))?;

    store.save(&config).await?;
    presenter.success(&format!("{} = {}", key, value));

    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let config = store.load().await?;
    match read_value(&config, key) {
        Some(v) => presenter.output(&v),
        None => presenter.output(NOT_SET),
    }

    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        let value = read_value(&config, key).unwrap_or_else(|| NOT_SET.to_string());
        presenter.key_value(key, &value);
    }

    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        return Ok(());
    }
    Err(invalid(
        key,
        format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
    ))
}

/// Validate `value` for `key` and store it in `config`
fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "max_duration" | "stale_buffer_timeout" => {
            let duration: Duration = value.parse().map_err(|e| invalid(key, e))?;
            let normalized = Some(duration.to_string());
            if key == "max_duration" {
                config.max_duration = normalized;
            } else {
                config.stale_buffer_timeout = normalized;
            }
        }
        "format" => {
            let format: AudioMimeType = value.parse().map_err(|e| invalid(key, e))?;
            config.format = Some(format.extension().to_string());
        }
        "sample_rate" => {
            let rate: u32 = value
                .parse()
                .map_err(|_| invalid(key, "Value must be a whole number of Hz"))?;
            if !SAMPLE_RATE_RANGE.contains(&rate) {
                return Err(invalid(
                    key,
                    format!(
                        "Value must be between {} and {}",
                        SAMPLE_RATE_RANGE.start(),
                        SAMPLE_RATE_RANGE.end()
                    ),
                ));
            }
            config.sample_rate = Some(rate);
        }
        "output_dir" => {
            if value.trim().is_empty() {
                return Err(invalid(key, "Value must not be empty"));
            }
            config.output_dir = Some(value.to_string());
        }
        "chunk_cap" => config.chunk_cap = Some(parse_size(key, value)?),
        "max_message_bytes" => config.max_message_bytes = Some(parse_size(key, value)?),
        "segment_memory_limit" => config.segment_memory_limit = Some(parse_size(key, value)?),
        "legacy_single_message" => {
            config.legacy_single_message = Some(
                parse_bool(value).map_err(|_| invalid(key, "Value must be 'true' or 'false'"))?,
            )
        }
        _ => return Err(invalid(key, "Unknown key")),
    }
    Ok(())
}

fn read_value(config: &AppConfig, key: &str) -> Option<String> {
    match key {
        "max_duration" => config.max_duration.clone(),
        "format" => config.format.clone(),
        "sample_rate" => config.sample_rate.map(|v| v.to_string()),
        "output_dir" => config.output_dir.clone(),
        "chunk_cap" => config.chunk_cap.map(|v| v.to_string()),
        "max_message_bytes" => config.max_message_bytes.map(|v| v.to_string()),
        "segment_memory_limit" => config.segment_memory_limit.map(|v| v.to_string()),
        "stale_buffer_timeout" => config.stale_buffer_timeout.clone(),
        "legacy_single_message" => config.legacy_single_message.map(|b| b.to_string()),
        _ => None,
    }
}

/// Parse a positive byte count
fn parse_size(key: &str, value: &str) -> Result<usize, ConfigError> {
    match value.parse::<usize>() {
        Ok(0) | Err(_) => Err(invalid(key, "Value must be a positive number of bytes")),
        Ok(n) => Ok(n),
    }
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ()> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(()),
    }
}

fn invalid(key: &str, message: impl ToString) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message: message.to_string(),
    }
}
